use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::credentials::CredentialError;
use crate::documents::ExtractError;
use crate::llm_client::LlmError;

/// User-facing message for any failure while talking to the chat endpoint.
pub const LLM_ERROR_MESSAGE: &str = "An error occurred while contacting the AI.";
/// User-facing message when the chat endpoint answers without `choices`.
pub const NO_RESPONSE_MESSAGE: &str = "No response received from the AI.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("{0}")]
    MissingCredential(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("LLM response carried no choices")]
    NoResponse,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::MissingEnv(_) | CredentialError::MissingSecret { .. } => {
                AppError::MissingCredential(e.to_string())
            }
            CredentialError::Unreadable { .. } => AppError::Internal(e.into()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        AppError::UnprocessableEntity(format!("Could not read the uploaded document: {e}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::MissingCredential(msg) => {
                tracing::warn!("{msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "MISSING_CREDENTIAL",
                    msg.clone(),
                )
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    LLM_ERROR_MESSAGE.to_string(),
                )
            }
            AppError::NoResponse => (
                StatusCode::BAD_GATEWAY,
                "NO_RESPONSE",
                NO_RESPONSE_MESSAGE.to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
