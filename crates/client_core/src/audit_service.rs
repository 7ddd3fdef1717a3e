use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::AuditResult,
    error::ServiceErrorBody,
    protocol::{decode_audit_response, AuditRequest, AUDIT_PATH},
};
use tracing::debug;

use crate::error::TransportError;

const ERROR_DETAIL_MAX_CHARS: usize = 200;

/// The remote citation verifier. Opaque, possibly slow, possibly failing.
#[async_trait]
pub trait AuditService: Send + Sync {
    async fn audit(&self, text: &str) -> Result<Vec<AuditResult>, TransportError>;
}

/// How a failed audit call is repeated before the failure is reported.
///
/// Retries happen inside one submission; the session never leaves its
/// submitting state between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Report the first failure; the user retries by submitting again.
    #[default]
    None,
    /// Up to `max_attempts` calls in total, doubling the wait each time.
    Backoff {
        max_attempts: u32,
        initial_delay: Duration,
    },
}

impl RetryPolicy {
    /// `max_attempts <= 1` means no retry.
    pub fn from_max_attempts(max_attempts: u32, initial_delay: Duration) -> Self {
        if max_attempts <= 1 {
            Self::None
        } else {
            Self::Backoff {
                max_attempts,
                initial_delay,
            }
        }
    }

    /// Wait before the next attempt after `attempt` calls failed with `err`,
    /// or `None` to give up.
    pub fn delay_after(&self, attempt: u32, err: &TransportError) -> Option<Duration> {
        match *self {
            Self::None => None,
            Self::Backoff {
                max_attempts,
                initial_delay,
            } => {
                if attempt >= max_attempts || !err.is_retryable() {
                    return None;
                }
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                Some(initial_delay.saturating_mul(factor))
            }
        }
    }
}

pub struct HttpAuditService {
    http: Client,
    base_url: String,
}

impl HttpAuditService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, AUDIT_PATH)
    }
}

#[async_trait]
impl AuditService for HttpAuditService {
    async fn audit(&self, text: &str) -> Result<Vec<AuditResult>, TransportError> {
        let response = self
            .http
            .post(self.endpoint())
            .json(&AuditRequest {
                text: text.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "audit service responded");

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        decode_audit_response(&body).map_err(|err| TransportError::Decode(err.to_string()))
    }
}

fn error_detail(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ServiceErrorBody>(body) {
        return parsed.detail_text();
    }
    let raw = String::from_utf8_lossy(body);
    let raw = raw.trim();
    if raw.chars().count() > ERROR_DETAIL_MAX_CHARS {
        let truncated: String = raw.chars().take(ERROR_DETAIL_MAX_CHARS).collect();
        format!("{truncated}...")
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
#[path = "tests/audit_service_tests.rs"]
mod tests;
