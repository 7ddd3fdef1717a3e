use std::time::Duration;

use thiserror::Error;

/// Input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("input text has {chars} characters; the limit is {limit}")]
    TooLong { chars: usize, limit: usize },
}

/// Failure talking to the audit service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("audit service unreachable: {0}")]
    Network(String),
    #[error("audit service returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("audit service sent an unusable payload: {0}")]
    Decode(String),
    #[error("audit service did not answer within {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Whether repeating the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                detail: err.to_string(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Failure writing the history cache to its store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("history store failed: {0:#}")]
    Store(anyhow::Error),
    #[error("history could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid audit service url '{url}': {source}")]
    InvalidApiUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("audit service url '{0}' must use http or https")]
    UnsupportedScheme(String),
}
