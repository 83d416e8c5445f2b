//! In-process stand-in for the OpenAI API, bound to an ephemeral local port.

use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use async_trait::async_trait;
use secrecy::SecretString;

use crate::credentials::{CredentialError, CredentialProvider, API_KEY_NAME};

/// Credential provider with a fixed answer; `None` behaves like an unset variable.
pub struct StaticCredentials(pub Option<&'static str>);

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn api_key(&self) -> Result<SecretString, CredentialError> {
        self.0
            .map(|key| SecretString::from(key.to_string()))
            .ok_or_else(|| CredentialError::MissingEnv(API_KEY_NAME.to_string()))
    }
}

#[derive(Debug, Clone)]
pub enum MockReply {
    Json { status: u16, body: Value },
    Raw { status: u16, body: String },
}

impl MockReply {
    /// A well-formed chat completion carrying `text`.
    pub fn answer(text: &str) -> Self {
        MockReply::Json {
            status: 200,
            body: json!({
                "id": "chatcmpl-mock",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": text},
                    "finish_reason": "stop"
                }]
            }),
        }
    }

    pub fn status(status: u16, body: Value) -> Self {
        MockReply::Json { status, body }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        MockReply::Raw {
            status,
            body: body.to_string(),
        }
    }
}

impl IntoResponse for MockReply {
    fn into_response(self) -> Response {
        match self {
            MockReply::Json { status, body } => (code(status), Json(body)).into_response(),
            MockReply::Raw { status, body } => (code(status), body).into_response(),
        }
    }
}

fn code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap()
}

#[derive(Debug, Clone)]
pub struct RecordedChat {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub purpose: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RecordedAssistant {
    pub beta: Option<String>,
    pub body: Value,
}

#[derive(Debug)]
struct Recorder {
    chat_reply: MockReply,
    assistant_failure: Option<(u16, String)>,
    chats: Vec<RecordedChat>,
    uploads: Vec<RecordedUpload>,
    assistants: Vec<RecordedAssistant>,
}

type Shared = Arc<Mutex<Recorder>>;

pub struct MockOpenAi {
    /// Equivalent of `https://api.openai.com/v1`.
    pub base_url: String,
    recorder: Shared,
}

impl MockOpenAi {
    pub fn chat_requests(&self) -> Vec<RecordedChat> {
        self.recorder.lock().unwrap().chats.clone()
    }

    pub fn file_uploads(&self) -> Vec<RecordedUpload> {
        self.recorder.lock().unwrap().uploads.clone()
    }

    pub fn assistant_requests(&self) -> Vec<RecordedAssistant> {
        self.recorder.lock().unwrap().assistants.clone()
    }

    pub fn set_chat_reply(&self, reply: MockReply) {
        self.recorder.lock().unwrap().chat_reply = reply;
    }

    pub fn fail_assistants(&self, status: u16, message: &str) {
        self.recorder.lock().unwrap().assistant_failure = Some((status, message.to_string()));
    }
}

pub async fn spawn_mock_openai(chat_reply: MockReply) -> MockOpenAi {
    let recorder: Shared = Arc::new(Mutex::new(Recorder {
        chat_reply,
        assistant_failure: None,
        chats: Vec::new(),
        uploads: Vec::new(),
        assistants: Vec::new(),
    }));

    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/files", post(files))
        .route("/v1/assistants", post(assistants))
        .with_state(recorder.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockOpenAi {
        base_url: format!("http://{addr}/v1"),
        recorder,
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn chat_completions(
    State(recorder): State<Shared>,
    headers: HeaderMap,
    body: Bytes,
) -> MockReply {
    let mut recorder = recorder.lock().unwrap();
    recorder.chats.push(RecordedChat {
        authorization: header(&headers, "authorization"),
        content_type: header(&headers, "content-type"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });
    recorder.chat_reply.clone()
}

async fn files(State(recorder): State<Shared>, mut multipart: Multipart) -> Json<Value> {
    let mut upload = RecordedUpload {
        purpose: String::new(),
        file_name: String::new(),
        bytes: Vec::new(),
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("purpose") => upload.purpose = field.text().await.unwrap(),
            Some("file") => {
                upload.file_name = field.file_name().unwrap_or_default().to_string();
                upload.bytes = field.bytes().await.unwrap().to_vec();
            }
            _ => {}
        }
    }

    let mut recorder = recorder.lock().unwrap();
    recorder.uploads.push(upload);
    Json(json!({
        "id": format!("file-mock-{}", recorder.uploads.len()),
        "object": "file",
        "purpose": "assistants"
    }))
}

async fn assistants(
    State(recorder): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> MockReply {
    let mut recorder = recorder.lock().unwrap();
    if let Some((status, message)) = recorder.assistant_failure.clone() {
        return MockReply::status(status, json!({"error": {"message": message}}));
    }
    recorder.assistants.push(RecordedAssistant {
        beta: header(&headers, "openai-beta"),
        body,
    });
    MockReply::status(
        200,
        json!({
            "id": format!("asst-mock-{}", recorder.assistants.len()),
            "object": "assistant"
        }),
    )
}
