use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error body the audit service sends with non-success responses.
///
/// `detail` is either a plain message or a list of validation entries,
/// each with its own `msg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    pub detail: Value,
}

impl ServiceErrorBody {
    pub fn detail_text(&self) -> String {
        match &self.detail {
            Value::String(message) => message.clone(),
            Value::Array(entries) => entries
                .iter()
                .map(|entry| {
                    entry
                        .get("msg")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| entry.to_string())
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed audit payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("audit payload must be a JSON array, got {found}")]
    NotArray { found: &'static str },
    #[error("audit result {index} is malformed: {source}")]
    Element {
        index: usize,
        source: serde_json::Error,
    },
    #[error("audit result {index} has an empty citation_text")]
    EmptyCitation { index: usize },
}
