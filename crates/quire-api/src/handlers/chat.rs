//! Chat session handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SendChatBody {
    pub chat: String,
}

pub async fn create_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let session = state.chat.create_session().await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn list_sessions(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.chat.list_sessions().await?;
    Ok(Json(sessions))
}

pub async fn get_chat_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.chat.get_chat_history(id).await?;
    Ok(Json(messages))
}

pub async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SendChatBody>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.chat.send_chat(id, &body.chat).await?;
    Ok(Json(response))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.chat.delete_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
