use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Verdict assigned by the audit service to one detected citation.
///
/// The known set is closed, but the service may grow new values; anything
/// unrecognised is kept verbatim in [`VerdictStatus::Unknown`] so it can be
/// rendered neutrally and written back unchanged. A non-string value keeps
/// its JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Value", into = "String")]
pub enum VerdictStatus {
    Real,
    Fake,
    Mismatch,
    Unverified,
    Suspicious,
    MinorError,
    Unknown(String),
}

impl VerdictStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Real => "REAL",
            Self::Fake => "FAKE",
            Self::Mismatch => "MISMATCH",
            Self::Unverified => "UNVERIFIED",
            Self::Suspicious => "SUSPICIOUS",
            Self::MinorError => "MINOR_ERROR",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for VerdictStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "REAL" => Self::Real,
            "FAKE" => Self::Fake,
            "MISMATCH" => Self::Mismatch,
            "UNVERIFIED" => Self::Unverified,
            "SUSPICIOUS" => Self::Suspicious,
            "MINOR_ERROR" => Self::MinorError,
            _ => Self::Unknown(value),
        }
    }
}

impl From<Value> for VerdictStatus {
    fn from(value: Value) -> Self {
        match value {
            Value::String(raw) => raw.into(),
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<VerdictStatus> for String {
    fn from(value: VerdictStatus) -> Self {
        match value {
            VerdictStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bibliographic match reported alongside a verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oa_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
}

impl CitationMetadata {
    /// Extracts the known fields from an arbitrary JSON value.
    ///
    /// Returns `None` when the value is not an object or carries none of the
    /// known fields. Fields of the wrong JSON type are dropped one by one.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        // The service stringifies a missing publication year as "None".
        let year = match object.get("year") {
            Some(Value::String(s)) if !s.trim().is_empty() && s != "None" => {
                Some(s.trim().to_string())
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let authors = object
            .get("authors")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty());

        let metadata = Self {
            title: text("title"),
            year,
            oa_url: text("oa_url"),
            doi: text("doi"),
            authors,
        };

        (!metadata.is_empty()).then_some(metadata)
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.year.is_none()
            && self.oa_url.is_none()
            && self.doi.is_none()
            && self.authors.is_none()
    }
}

fn lenient_metadata<'de, D>(deserializer: D) -> Result<Option<CitationMetadata>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(CitationMetadata::from_value))
}

fn lenient_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// One verdict for one citation detected in the submitted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    pub citation_text: String,
    pub status: VerdictStatus,
    #[serde(default)]
    pub source: String,
    /// Zero means "not applicable", not "no confidence".
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub message: String,
    #[serde(
        default,
        deserialize_with = "lenient_metadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata: Option<CitationMetadata>,
}

impl AuditResult {
    pub fn new(citation_text: impl Into<String>, status: VerdictStatus) -> Self {
        Self {
            citation_text: citation_text.into(),
            status,
            source: String::new(),
            confidence: 0.0,
            message: String::new(),
            metadata: None,
        }
    }

    /// Confidence as a whole percentage, or `None` when not applicable.
    pub fn confidence_percent(&self) -> Option<u32> {
        if self.confidence.is_finite() && self.confidence > 0.0 {
            Some((self.confidence * 100.0).round() as u32)
        } else {
            None
        }
    }
}

/// Identifier of a persisted audit session.
///
/// Generated ids are the creation time in epoch milliseconds, zero-padded
/// to a fixed width so that string order follows creation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryId(pub String);

impl HistoryId {
    pub fn from_timestamp_millis(timestamp: i64) -> Self {
        Self(format!("{timestamp:016}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HistoryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: HistoryId,
    /// Epoch milliseconds; authoritative for ordering.
    pub timestamp: i64,
    pub input_text: String,
    pub results: Vec<AuditResult>,
}

impl HistoryItem {
    pub fn has_fake(&self) -> bool {
        self.results.iter().any(|r| r.status == VerdictStatus::Fake)
    }
}
