use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError};

const LOGIN_PATH: &str = "/api/v1/auth/login";
const LOGOUT_PATH: &str = "/api/v1/auth/logout";
const ME_PATH: &str = "/api/v1/auth/me";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(rename = "userId")]
    pub id: String,
    pub username: String,
    pub role: String,
    #[serde(rename = "pfp_url", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "tokenUser")]
    token_user: SessionUser,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(rename = "tokenUser", default)]
    token_user: Option<SessionUser>,
}

/// Session calls. The session itself is the cookie kept by [`ApiClient`].
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<SessionUser, ApiError> {
        tracing::info!(username = %credentials.username, "Logging in");
        let resp: LoginResponse = self.api.post(LOGIN_PATH, credentials).await?;
        tracing::info!(username = %resp.token_user.username, role = %resp.token_user.role, "Login successful");
        Ok(resp.token_user)
    }

    pub async fn logout(&self) {
        match self.api.get_discard(LOGOUT_PATH).await {
            Ok(()) => tracing::info!("Logout successful"),
            Err(err) => tracing::warn!(error = %err, "Logout failed"),
        }
    }

    /// `Ok(None)` when nobody is logged in, including a 401 from the server.
    pub async fn current_user(&self) -> Result<Option<SessionUser>, ApiError> {
        match self.api.get::<MeResponse>(ME_PATH).await {
            Ok(resp) => Ok(resp.token_user),
            Err(err) if err.is_unauthorized() => {
                tracing::debug!("Not authenticated");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        match self.current_user().await {
            Ok(user) => user.is_some(),
            Err(err) => {
                tracing::warn!(error = %err, "Could not check session");
                false
            }
        }
    }
}
