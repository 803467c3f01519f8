//! Note handlers: CRUD, move, attachment upload and semantic search.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use quire_core::{CreateNoteRequest, UpdateNoteRequest};

use super::{ApiError, AppState};
use crate::services::Attachment;

/// Header carrying the uploader's file name on attachment uploads.
pub const FILE_NAME_HEADER: &str = "x-file-name";

pub async fn create_note(
    State(state): State<AppState>,
    Json(body): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.notes.create_note(body).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.notes.get_note(id).await?;
    Ok(Json(note))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.notes.update_note(id, body).await?;
    Ok(Json(note))
}

#[derive(Debug, Deserialize)]
pub struct MoveNoteBody {
    pub notebook_id: Uuid,
}

pub async fn move_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MoveNoteBody>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.notes.move_note(id, body.notebook_id).await?;
    Ok(Json(note))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.notes.delete_note(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Raw-body upload. The file name comes from `x-file-name`, the media type
/// from `content-type` (defaulting to `application/pdf`).
pub async fn attach_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let original_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} header is required", FILE_NAME_HEADER)))?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/pdf");

    let file = state
        .notes
        .attach_file(
            id,
            Attachment {
                original_name: original_name.to_string(),
                content_type: content_type.to_string(),
                data: body.to_vec(),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(file)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

pub async fn search_notes(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let hits = state.search.search(&query.q).await?;
    Ok(Json(hits))
}
