//! Assistant bootstrap: creates the vendor-side assistant once and reuses it.
//!
//! The assistant id is cached in a local JSON file (`{"assistant_id": "..."}`).
//! When the file exists it is trusted and no vendor call is made. Otherwise the
//! training document is uploaded, an assistant with retrieval over that file is
//! created, and its id is written to the file.
//!
//! Not used by the session loop; exposed through the `bootstrap-assistant`
//! subcommand. There is no cross-process lock, so two first-time runs at once
//! can each create an assistant.

pub mod prompts;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::assistant::prompts::ASSISTANT_INSTRUCTIONS;
use crate::llm_client::{AssistantTool, CreateAssistantRequest, LlmClient, LlmError};

const FILE_PURPOSE: &str = "assistants";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Training data file '{}' not found", .0.display())]
    MissingTrainingFile(PathBuf),

    #[error("Training data file '{}' could not be read: {source}", path.display())]
    TrainingFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Training file upload failed: {0}")]
    Upload(#[source] LlmError),

    #[error("Assistant creation failed: {0}")]
    Create(#[source] LlmError),

    #[error("Assistant record '{}' could not be {action}: {message}", path.display())]
    Store {
        path: PathBuf,
        action: &'static str,
        message: String,
    },
}

/// Whether the id came from the local record or from a fresh creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantOrigin {
    Loaded,
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantRecord {
    pub assistant_id: String,
    pub origin: AssistantOrigin,
}

pub struct BootstrapRequest<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub model: &'a str,
    pub training_file: &'a Path,
}

/// The two vendor operations the bootstrap needs.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn upload_training_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, LlmError>;

    async fn create_assistant(
        &self,
        request: &CreateAssistantRequest<'_>,
    ) -> Result<String, LlmError>;
}

/// `AssistantApi` backed by the OpenAI files and assistants endpoints.
pub struct OpenAiAssistants {
    llm: LlmClient,
    api_key: SecretString,
}

impl OpenAiAssistants {
    pub fn new(llm: LlmClient, api_key: SecretString) -> Self {
        Self { llm, api_key }
    }
}

#[async_trait]
impl AssistantApi for OpenAiAssistants {
    async fn upload_training_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, LlmError> {
        self.llm
            .upload_file(&self.api_key, file_name, bytes, FILE_PURPOSE)
            .await
    }

    async fn create_assistant(
        &self,
        request: &CreateAssistantRequest<'_>,
    ) -> Result<String, LlmError> {
        self.llm.create_assistant(&self.api_key, request).await
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredAssistant {
    assistant_id: String,
}

/// The local `assistant.json` record.
pub struct AssistantStore {
    path: PathBuf,
}

impl AssistantStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<String>, BootstrapError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.store_error("read", e.to_string())),
        };
        let stored: StoredAssistant =
            serde_json::from_str(&raw).map_err(|e| self.store_error("parsed", e.to_string()))?;
        Ok(Some(stored.assistant_id))
    }

    pub async fn save(&self, assistant_id: &str) -> Result<(), BootstrapError> {
        let body = serde_json::to_string(&StoredAssistant {
            assistant_id: assistant_id.to_string(),
        })
        .map_err(|e| self.store_error("written", e.to_string()))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| self.store_error("written", e.to_string()))
    }

    fn store_error(&self, action: &'static str, message: String) -> BootstrapError {
        BootstrapError::Store {
            path: self.path.clone(),
            action,
            message,
        }
    }
}

/// Returns the cached assistant id, or creates the assistant and caches its id.
/// Failures are logged here and returned to the caller.
pub async fn bootstrap_assistant(
    api: &dyn AssistantApi,
    store: &AssistantStore,
    request: &BootstrapRequest<'_>,
) -> Result<AssistantRecord, BootstrapError> {
    let result = load_or_create(api, store, request).await;
    if let Err(e) = &result {
        error!("Error in creating assistant: {e}");
    }
    result
}

async fn load_or_create(
    api: &dyn AssistantApi,
    store: &AssistantStore,
    request: &BootstrapRequest<'_>,
) -> Result<AssistantRecord, BootstrapError> {
    if let Some(assistant_id) = store.load().await? {
        info!("Loaded existing assistant ID.");
        return Ok(AssistantRecord {
            assistant_id,
            origin: AssistantOrigin::Loaded,
        });
    }

    let training_file = request.training_file;
    let bytes = match tokio::fs::read(training_file).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BootstrapError::MissingTrainingFile(
                training_file.to_path_buf(),
            ))
        }
        Err(source) => {
            return Err(BootstrapError::TrainingFileUnreadable {
                path: training_file.to_path_buf(),
                source,
            })
        }
    };

    let file_name = training_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "training_data".to_string());
    let file_id = api
        .upload_training_file(&file_name, bytes)
        .await
        .map_err(BootstrapError::Upload)?;

    let assistant_id = api
        .create_assistant(&CreateAssistantRequest {
            name: request.name,
            description: request.description,
            instructions: ASSISTANT_INSTRUCTIONS,
            model: request.model,
            tools: vec![AssistantTool::retrieval()],
            file_ids: vec![file_id],
        })
        .await
        .map_err(BootstrapError::Create)?;

    store.save(&assistant_id).await?;
    info!("Created a new assistant and saved the ID.");

    Ok(AssistantRecord {
        assistant_id,
        origin: AssistantOrigin::Created,
    })
}
