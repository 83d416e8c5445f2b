use std::sync::Arc;
use std::time::Duration;

use crate::chat::session::SessionStore;
use crate::config::Config;
use crate::credentials::CredentialProvider;
use crate::llm_client::{LlmClient, LlmError};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub sessions: SessionStore,
    /// Consulted on every interaction; environment or secret store.
    pub credentials: Arc<dyn CredentialProvider>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, credentials: Arc<dyn CredentialProvider>) -> Result<Self, LlmError> {
        let llm = LlmClient::new(
            &config.api_base,
            config.llm_timeout_secs.map(Duration::from_secs),
        )?;
        // from_env rejects out-of-range TTLs; hand-built configs saturate.
        let sessions = SessionStore::new(config.session_ttl().unwrap_or(chrono::Duration::MAX));
        Ok(Self {
            llm,
            sessions,
            credentials,
            config,
        })
    }
}
