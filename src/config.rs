//! Runtime configuration, read from the environment (and `.env` via dotenvy).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BackendError, BackendResult};

const APP_DIR_NAME: &str = "cloud-diary";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Project URL without any `/auth/v1` or `/rest/v1` suffix.
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> BackendResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BackendResult<Self> {
        let url = normalize_text_option(lookup("SUPABASE_URL"));
        let anon_key = normalize_text_option(lookup("SUPABASE_ANON_KEY"));
        let (Some(url), Some(anon_key)) = (url, anon_key) else {
            return Err(BackendError::NotConfigured);
        };

        let data_dir = normalize_text_option(lookup("DIARY_DATA_DIR"))
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME)))
            .ok_or(BackendError::InvalidConfiguration(
                "could not resolve a data directory; set DIARY_DATA_DIR",
            ))?;
        let log_file = normalize_text_option(lookup("DIARY_LOG_FILE"))
            .map_or_else(|| data_dir.join("cloud-diary.log"), PathBuf::from);
        let http_timeout = match normalize_text_option(lookup("DIARY_HTTP_TIMEOUT_SECS")) {
            Some(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                BackendError::InvalidConfiguration("DIARY_HTTP_TIMEOUT_SECS must be a number")
            })?,
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            supabase_url: normalize_project_url(&url)?,
            supabase_anon_key: anon_key,
            data_dir,
            log_file,
            http_timeout,
        })
    }

    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.supabase_url)
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url)
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn http_client(&self) -> BackendResult<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()?)
    }
}

pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Strips trailing slashes and any API suffix so both base URLs can be derived.
pub fn normalize_project_url(url: &str) -> BackendResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(BackendError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(BackendError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }
    let base = trimmed
        .strip_suffix("/auth/v1")
        .or_else(|| trimmed.strip_suffix("/rest/v1"))
        .unwrap_or(trimmed);
    Ok(base.to_string())
}
