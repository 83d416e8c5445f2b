use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::credentials::CredentialSource;

/// Application configuration loaded from environment variables.
/// Every variable has a default; the API key is looked up per interaction,
/// not here, so the server starts even when it is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub model: String,
    pub api_base: String,
    pub credential_source: CredentialSource,
    pub secrets_file: PathBuf,
    pub session_ttl_secs: u64,
    pub max_upload_bytes: usize,
    /// Outbound chat calls have no timeout unless this is set.
    pub llm_timeout_secs: Option<u64>,
    pub assistant_store_path: PathBuf,
    pub training_data_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            model: "gpt-4-1106-preview".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            credential_source: CredentialSource::Env,
            secrets_file: PathBuf::from("secrets.toml"),
            session_ttl_secs: 3600,
            max_upload_bytes: 200 * 1024 * 1024,
            llm_timeout_secs: None,
            assistant_store_path: PathBuf::from("assistant.json"),
            training_data_file: PathBuf::from("Nursing_Knowledge.docx"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        let config = Config {
            port: parse_env("PORT")?.unwrap_or(defaults.port),
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            api_base: std::env::var("OPENAI_API_BASE").unwrap_or(defaults.api_base),
            credential_source: parse_env("CREDENTIAL_SOURCE")?
                .unwrap_or(defaults.credential_source),
            secrets_file: std::env::var("SECRETS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.secrets_file),
            session_ttl_secs: parse_env("SESSION_TTL_SECS")?.unwrap_or(defaults.session_ttl_secs),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS")?,
            assistant_store_path: std::env::var("ASSISTANT_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.assistant_store_path),
            training_data_file: std::env::var("TRAINING_DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.training_data_file),
        };
        config.session_ttl().with_context(|| {
            format!(
                "Environment variable 'SESSION_TTL_SECS' is out of range: {}",
                config.session_ttl_secs
            )
        })?;
        Ok(config)
    }

    /// `None` when the TTL does not fit a `chrono::Duration`.
    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        i64::try_from(self.session_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }
}

/// Reads an optional variable and parses it, failing startup on a malformed value.
fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(None),
    }
}
