use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{domain::AuditResult, error::PayloadError};

pub const AUDIT_PATH: &str = "/api/audit";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRequest {
    pub text: String,
}

/// Decodes an audit response body.
///
/// The body must be a JSON array. Every element must decode as an
/// [`AuditResult`] with a non-empty `citation_text`; a single bad element
/// rejects the whole payload.
pub fn decode_audit_response(body: &[u8]) -> Result<Vec<AuditResult>, PayloadError> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Array(items) = value else {
        return Err(PayloadError::NotArray {
            found: json_kind(&value),
        });
    };

    let mut results = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let result: AuditResult = serde_json::from_value(item)
            .map_err(|source| PayloadError::Element { index, source })?;
        if result.citation_text.trim().is_empty() {
            return Err(PayloadError::EmptyCitation { index });
        }
        results.push(result);
    }
    Ok(results)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
