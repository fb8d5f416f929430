use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Unauthorized { message: String },
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status().map(|status| status.as_u16()),
            ApiError::Decode(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "msg")]
    message: Option<String>,
}

/// JSON client for the portal API.
///
/// Cookies set by the server (the login session) are kept and replayed on
/// every later request made through any clone of the client.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.execute(self.request(Method::GET, path)).await?;
        decode(&body)
    }

    pub async fn post<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .execute(self.request(Method::POST, path).json(payload))
            .await?;
        decode(&body)
    }

    pub async fn patch<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .execute(self.request(Method::PATCH, path).json(payload))
            .await?;
        decode(&body)
    }

    /// Sends a multipart form; the body sets its own content type.
    pub async fn patch_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!(method = "PATCH", url = %url, "Sending multipart request");
        let builder = self
            .http
            .request(Method::PATCH, url)
            .timeout(self.timeout)
            .multipart(form);
        let body = self.execute(builder).await?;
        decode(&body)
    }

    /// DELETE whose response body, if any, is not needed.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// GET whose response body, if any, is not needed.
    pub async fn get_discard(&self, path: &str) -> Result<(), ApiError> {
        self.execute(self.request(Method::GET, path)).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        tracing::debug!(method = %method, url = %url, "Sending request");
        self.http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let resp = builder.send().await.map_err(|err| {
            tracing::warn!(error = %err, "API request failed");
            ApiError::Transport(err)
        })?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err = error_for_status(status, &body);
            tracing::warn!(status = status.as_u16(), error = %err, "API error response");
            return Err(err);
        }

        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Maps each entry of a list payload on its own. Entries that do not fit the
/// wire schema are logged and left out.
pub(crate) fn decode_records<W, T>(resource: &str, raw: Vec<serde_json::Value>) -> Vec<T>
where
    W: DeserializeOwned,
    T: TryFrom<W, Error = ApiError>,
{
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let mapped = serde_json::from_value::<W>(value)
                .map_err(|err| ApiError::Decode(err.to_string()))
                .and_then(T::try_from);
            match mapped {
                Ok(item) => Some(item),
                Err(err) => {
                    tracing::warn!(resource, index, error = %err, "Skipping malformed record");
                    None
                }
            }
        })
        .collect()
}

fn error_for_status(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));

    if status == StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized { message }
    } else {
        ApiError::Status {
            status: status.as_u16(),
            message,
        }
    }
}
