//! HTTP handlers for quire-api.
//!
//! Handlers only translate between HTTP and the service layer; every rule
//! lives in [`crate::services`].

pub mod chat;
pub mod notebooks;
pub mod notes;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use quire_core::defaults;

use crate::services::{ChatService, NoteService, SearchService};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub notes: Arc<NoteService>,
    pub search: Arc<SearchService>,
}

impl AppState {
    pub fn new(chat: ChatService, notes: NoteService, search: SearchService) -> Self {
        Self {
            chat: Arc::new(chat),
            notes: Arc::new(notes),
            search: Arc::new(search),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Notebooks
        .route(
            "/api/v1/notebooks",
            get(notebooks::list_notebooks).post(notebooks::create_notebook),
        )
        .route(
            "/api/v1/notebooks/:id",
            get(notebooks::get_notebook).delete(notebooks::delete_notebook),
        )
        // Notes
        .route("/api/v1/notes", post(notes::create_note))
        .route("/api/v1/notes/search", get(notes::search_notes))
        .route(
            "/api/v1/notes/:id",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route("/api/v1/notes/:id/move", put(notes::move_note))
        .route("/api/v1/notes/:id/file", put(notes::attach_file))
        // Chat
        .route(
            "/api/v1/chat/sessions",
            get(chat::list_sessions).post(chat::create_session),
        )
        .route("/api/v1/chat/sessions/:id", delete(chat::delete_session))
        .route(
            "/api/v1/chat/sessions/:id/messages",
            get(chat::get_chat_history).post(chat::send_chat),
        )
        .layer(DefaultBodyLimit::max(defaults::MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by handlers, rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(quire_core::Error),
}

impl From<quire_core::Error> for ApiError {
    fn from(err: quire_core::Error) -> Self {
        match err {
            e if e.is_not_found() => ApiError::NotFound(e.to_string()),
            quire_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            e => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(err) => {
                error!(subsystem = "api", error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
