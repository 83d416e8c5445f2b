//! Credential providers: where the OpenAI API key comes from.
//!
//! The key is resolved on every interaction, so a deployment can add it
//! (or rotate it) without a restart. Both sources sit behind `CredentialProvider`.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;
use tracing::debug;

/// Name of the credential in both the environment and the secret store.
pub const API_KEY_NAME: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("OpenAI API key not found. Please set the {0} environment variable.")]
    MissingEnv(String),

    #[error("OpenAI API key not found. Please add {key} to {}.", path.display())]
    MissingSecret { key: String, path: PathBuf },

    #[error("Secret store {} could not be read: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn api_key(&self) -> Result<SecretString, CredentialError>;
}

/// Which provider `CREDENTIAL_SOURCE` selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Env,
    Secrets,
}

#[derive(Debug, Error)]
#[error("Unknown credential source '{0}' (expected 'env' or 'secrets')")]
pub struct UnknownCredentialSource(String);

impl FromStr for CredentialSource {
    type Err = UnknownCredentialSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "env" => Ok(CredentialSource::Env),
            "secrets" => Ok(CredentialSource::Secrets),
            other => Err(UnknownCredentialSource(other.to_string())),
        }
    }
}

/// Reads the key from a process environment variable.
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn api_key(&self) -> Result<SecretString, CredentialError> {
        match std::env::var(&self.var) {
            Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
            _ => Err(CredentialError::MissingEnv(self.var.clone())),
        }
    }
}

/// Reads the key from a flat TOML secret store, e.g. `OPENAI_API_KEY = "sk-..."`.
pub struct SecretsFileCredentials {
    path: PathBuf,
    key: String,
}

impl SecretsFileCredentials {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    fn missing(&self) -> CredentialError {
        CredentialError::MissingSecret {
            key: self.key.clone(),
            path: self.path.clone(),
        }
    }
}

#[async_trait]
impl CredentialProvider for SecretsFileCredentials {
    async fn api_key(&self) -> Result<SecretString, CredentialError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Secret store {} does not exist", self.path.display());
                return Err(self.missing());
            }
            Err(e) => {
                return Err(CredentialError::Unreadable {
                    path: self.path.clone(),
                    message: e.to_string(),
                })
            }
        };

        let table = raw
            .parse::<toml::Table>()
            .map_err(|e| CredentialError::Unreadable {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        table
            .get(&self.key)
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .map(|v| SecretString::from(v.to_string()))
            .ok_or_else(|| self.missing())
    }
}

/// Builds the provider selected by configuration.
pub fn provider_for(
    source: CredentialSource,
    secrets_file: &std::path::Path,
) -> Arc<dyn CredentialProvider> {
    match source {
        CredentialSource::Env => Arc::new(EnvCredentials::new(API_KEY_NAME)),
        CredentialSource::Secrets => {
            Arc::new(SecretsFileCredentials::new(secrets_file, API_KEY_NAME))
        }
    }
}
