pub mod health;
pub mod ui;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::chat::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(ui::index_handler))
        .route("/health", get(health::health_handler))
        // Session API
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_end_session),
        )
        .route("/api/v1/sessions/:id/query", post(handlers::handle_query))
        .route(
            "/api/v1/sessions/:id/document",
            post(handlers::handle_upload),
        )
        // Raised from axum's 2MB default so full resumes fit.
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
