use std::time::Duration;

use url::Url;

use crate::error::ApiError;

pub const DEFAULT_API_BASE: &str = "https://mixo-fe-backend-task.vercel.app";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    /// Applies to one-shot fetches only. Streams stay open until either side closes.
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// How long a loaded dashboard is considered fresh.
    pub stale_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            stale_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_base: std::env::var("CAMPAIGN_API_BASE").unwrap_or(d.api_base),
            request_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.request_timeout_secs),
            connect_timeout_secs: std::env::var("HTTP_CONNECT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.connect_timeout_secs),
            stale_secs: std::env::var("STALE_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.stale_secs),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn api_base_url(&self) -> Result<Url, ApiError> {
        let url = Url::parse(&self.api_base)
            .map_err(|e| ApiError::Config(format!("invalid api base {:?}: {}", self.api_base, e)))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::Config(format!("api base {:?} cannot carry a path", self.api_base)));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_secs)
    }
}
