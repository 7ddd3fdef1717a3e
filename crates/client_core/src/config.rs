use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::{audit_service::RetryPolicy, error::SettingsError, localization::Language};

pub const CONFIG_FILE_NAME: &str = "veru.toml";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_INITIAL_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    /// `None` selects the per-user data directory.
    pub database_url: Option<String>,
    pub request_timeout: Duration,
    pub retry_policy: RetryPolicy,
    /// Overrides the ambient locale when set.
    pub language: Option<Language>,
    pub example_start: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            database_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_policy: RetryPolicy::None,
            language: None,
            example_start: 0,
        }
    }
}

impl Settings {
    pub fn database_url(&self) -> Result<String> {
        match &self.database_url {
            Some(url) => Ok(url.clone()),
            None => default_database_url(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    database_url: Option<String>,
    request_timeout_secs: Option<u64>,
    retry_max_attempts: Option<u32>,
    retry_initial_delay_ms: Option<u64>,
    language: Option<String>,
    example_start: Option<usize>,
}

/// Loads settings from defaults, the config file, then the environment.
///
/// A missing or malformed config file is logged and skipped.
pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let mut settings = Settings::default();

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    match fs::read_to_string(&path) {
        Ok(raw) => match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, file_cfg),
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring malformed config file"),
        },
        Err(err) if config_path.is_some() => {
            warn!(path = %path.display(), error = %err, "config file unreadable")
        }
        Err(_) => {}
    }

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.database_url {
        settings.database_url = Some(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs.and_then(request_timeout_from_secs) {
        settings.request_timeout = v;
    }
    let initial_delay = file_cfg
        .retry_initial_delay_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_RETRY_INITIAL_DELAY);
    if let Some(v) = file_cfg.retry_max_attempts {
        settings.retry_policy = RetryPolicy::from_max_attempts(v, initial_delay);
    }
    if let Some(v) = file_cfg.language {
        settings.language = parse_language(&v);
    }
    if let Some(v) = file_cfg.example_start {
        settings.example_start = v;
    }
}

/// Applies `VERU_*` and `APP__*` overrides; `APP__*` wins when both are set.
pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = read("VERU_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = read("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = read("VERU_DATABASE_URL") {
        settings.database_url = Some(v);
    }
    if let Some(v) = read("APP__DATABASE_URL") {
        settings.database_url = Some(v);
    }

    if let Some(v) = read("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(secs) => {
                if let Some(timeout) = request_timeout_from_secs(secs) {
                    settings.request_timeout = timeout;
                }
            }
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__REQUEST_TIMEOUT_SECS"),
        }
    }

    if let Some(v) = read("APP__RETRY_MAX_ATTEMPTS") {
        match v.parse::<u32>() {
            Ok(attempts) => {
                settings.retry_policy =
                    RetryPolicy::from_max_attempts(attempts, DEFAULT_RETRY_INITIAL_DELAY)
            }
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__RETRY_MAX_ATTEMPTS"),
        }
    }

    if let Some(v) = read("APP__LANGUAGE") {
        settings.language = parse_language(&v);
    }
}

/// A zero timeout would fail every audit before it is sent.
pub fn request_timeout_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        warn!("ignoring request timeout of 0 seconds");
        return None;
    }
    Some(Duration::from_secs(secs))
}

fn parse_language(raw: &str) -> Option<Language> {
    let language = Language::from_code(raw);
    if language.is_none() {
        warn!(value = raw, "ignoring unsupported language");
    }
    language
}

/// Normalizes an audit service base url, dropping any trailing slash.
pub fn validate_api_url(raw: &str) -> Result<String, SettingsError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|source| SettingsError::InvalidApiUrl {
        url: trimmed.to_string(),
        source,
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SettingsError::UnsupportedScheme(trimmed.to_string()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

pub fn default_database_url() -> Result<String> {
    let base = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("unable to resolve local app data dir"))?;
    Ok(storage::sqlite_url_for_path(
        &base.join("veru").join("history.sqlite3"),
    ))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
