//! Axum route handlers for the session API.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Multipart, Path, Request, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::chat::query::answer_query;
use crate::chat::session::{DocumentSummary, Session, SessionHandle, Turn};
use crate::documents::{extract_text, has_accepted_extension, DocumentKind, ACCEPTED_EXTENSIONS};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub history: Vec<Turn>,
    pub document: Option<DocumentSummary>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id,
            history: session.history().to_vec(),
            document: session.document().cloned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub history: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document: DocumentSummary,
}

/// JSON body extractor whose rejections use the `AppError` body shape.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionView>) {
    let handle = state.sessions.create().await;
    let session = handle.lock().await;
    (StatusCode::CREATED, Json(SessionView::from(&*session)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, id).await?;
    let mut session = handle.lock().await;
    session.touch(Utc::now());
    Ok(Json(SessionView::from(&*session)))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// POST /api/v1/sessions/:id/query
///
/// A missing credential stops the action before anything is recorded.
pub async fn handle_query(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let handle = find_session(&state, id).await?;
    let mut session = handle.lock().await;
    session.touch(Utc::now());

    let api_key = state.credentials.api_key().await?;

    let answer = answer_query(
        &mut session,
        &request.query,
        &state.llm,
        &api_key,
        &state.config.model,
    )
    .await?;

    Ok(Json(QueryResponse {
        answer,
        history: session.history().to_vec(),
    }))
}

/// POST /api/v1/sessions/:id/document
///
/// Multipart field `file`. The declared MIME type picks the extractor; the
/// extracted text replaces the session's current document.
pub async fn handle_upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let handle = find_session(&state, id).await?;
    let mut session = handle.lock().await;
    session.touch(Utc::now());

    let upload = read_upload(&mut multipart).await?;
    let name = upload.file_name.as_deref().unwrap_or_default();
    if !has_accepted_extension(name) {
        return Err(AppError::Validation(format!(
            "Unsupported file '{name}'; accepted types: {}",
            ACCEPTED_EXTENSIONS.join(", ")
        )));
    }

    let kind = DocumentKind::from_mime(upload.content_type.as_deref());
    let data = upload.data;
    let size = data.len();

    // Parsing is CPU-bound.
    let extracted = tokio::task::spawn_blocking(move || extract_text(&data, kind))
        .await
        .map_err(|e| {
            if e.is_panic() {
                AppError::UnprocessableEntity(
                    "Could not read the uploaded document: the parser crashed".to_string(),
                )
            } else {
                AppError::Internal(anyhow::anyhow!("Extraction task failed: {e}"))
            }
        })?;
    let text = extracted?;

    session.replace_document(upload.file_name, kind, text);
    let document = session
        .document()
        .cloned()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Document missing after upload")))?;

    info!(
        "Session {id}: loaded {:?} document ({size} bytes, {} chars)",
        document.kind, document.characters
    );
    Ok(Json(UploadResponse { document }))
}

async fn find_session(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(String::from);
        let content_type = field.content_type().map(String::from);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
        return Ok(Upload {
            file_name,
            content_type,
            data,
        });
    }
    Err(AppError::Validation(
        "No file was uploaded (expected multipart field 'file')".to_string(),
    ))
}
