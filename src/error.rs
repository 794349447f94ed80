//! Error taxonomy shared by the API client, the insights stream and the panel.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed, or the backend answered with a non-2xx status.
    #[error("network error on {endpoint}: {reason}")]
    Network { endpoint: String, reason: String },

    #[error("not found: {endpoint}")]
    NotFound { endpoint: String },

    #[error("malformed payload from {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    pub fn network(endpoint: &str, reason: impl std::fmt::Display) -> Self {
        ApiError::Network {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// Transport failure that terminates a subscription. Delivered at most once per handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Stream connection failed: {reason}")]
pub struct StreamError {
    pub entity_id: String,
    pub reason: String,
}

impl StreamError {
    pub fn new(entity_id: &str, reason: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            reason: reason.into(),
        }
    }
}
