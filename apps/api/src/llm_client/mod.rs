/// LLM client: the single point of entry for all OpenAI API calls.
///
/// ARCHITECTURAL RULE: No other module may call the OpenAI API directly.
/// Chat completions, file uploads and assistant creation all go through here.
///
/// Chat calls are deliberately single-shot: one POST, no retry, no backoff.
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Output token budget for every chat completion.
pub const MAX_TOKENS: u32 = 250;
const ASSISTANTS_BETA: &str = "assistants=v1";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Body of `POST /assistants`.
#[derive(Debug, Serialize)]
pub struct CreateAssistantRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub instructions: &'a str,
    pub model: &'a str,
    pub tools: Vec<AssistantTool>,
    pub file_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantTool {
    #[serde(rename = "type")]
    pub tool_type: String,
}

impl AssistantTool {
    pub fn retrieval() -> Self {
        Self {
            tool_type: "retrieval".to_string(),
        }
    }
}

/// Files and assistants both answer with an object carrying its `id`.
#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// Extracts `choices[0].message.content` from a raw chat-completion body.
/// `None` when `choices` is missing, empty, or has no string content.
pub fn answer_text(response: &Value) -> Option<&str> {
    response
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
}

/// The single OpenAI client used by all services.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_base: String,
}

impl LlmClient {
    pub fn new(api_base: &str, timeout: Option<Duration>) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.api_base)
    }

    /// Sends one chat completion and returns the JSON body unmodified,
    /// whatever the HTTP status. Callers check for an answer with [`answer_text`].
    pub async fn chat_completion(
        &self,
        api_key: &SecretString,
        model: &str,
        prompt: &str,
    ) -> Result<Value, LlmError> {
        let request_body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(self.url("chat/completions"))
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(api_key.expose_secret())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        debug!("Chat completion returned {} ({} bytes)", status, body.len());

        Ok(serde_json::from_slice(&body)?)
    }

    /// Uploads a file to the vendor's file storage and returns its id.
    pub async fn upload_file(
        &self,
        api_key: &SecretString,
        file_name: &str,
        bytes: Vec<u8>,
        purpose: &str,
    ) -> Result<String, LlmError> {
        let form = Form::new()
            .text("purpose", purpose.to_string())
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()));

        let response = self
            .client
            .post(self.url("files"))
            .bearer_auth(api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;

        let created: CreatedObject = parse_created(response).await?;
        debug!("Uploaded {file_name} as {}", created.id);
        Ok(created.id)
    }

    /// Creates an assistant resource and returns its id.
    pub async fn create_assistant(
        &self,
        api_key: &SecretString,
        request: &CreateAssistantRequest<'_>,
    ) -> Result<String, LlmError> {
        let response = self
            .client
            .post(self.url("assistants"))
            .header(CONTENT_TYPE, "application/json")
            .header("OpenAI-Beta", ASSISTANTS_BETA)
            .bearer_auth(api_key.expose_secret())
            .json(request)
            .send()
            .await?;

        let created: CreatedObject = parse_created(response).await?;
        debug!("Created assistant {}", created.id);
        Ok(created.id)
    }
}

async fn parse_created(response: reqwest::Response) -> Result<CreatedObject, LlmError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        // Try to parse error message
        let message = serde_json::from_str::<OpenAiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        return Err(LlmError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}
