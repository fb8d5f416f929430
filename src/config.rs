use std::env;
use std::time::Duration;

use crate::auth::Credentials;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_CACHE_PATH: &str = "./fsu_cache.db";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub cache_path: String,
    pub request_timeout: Duration,
    pub credentials: Option<Credentials>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());

        let api_url = non_empty("API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let cache_path = non_empty("CACHE_PATH").unwrap_or_else(|| DEFAULT_CACHE_PATH.to_string());
        let timeout_secs = non_empty("REQUEST_TIMEOUT_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let credentials = match (non_empty("ADMIN_USERNAME"), non_empty("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        Self {
            api_url,
            cache_path,
            request_timeout: Duration::from_secs(timeout_secs),
            credentials,
        }
    }
}
