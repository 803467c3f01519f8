//! Notebook handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use quire_core::CreateNotebookRequest;

use super::{ApiError, AppState};

pub async fn create_notebook(
    State(state): State<AppState>,
    Json(body): Json<CreateNotebookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let notebook = state.notes.create_notebook(body).await?;
    Ok((StatusCode::CREATED, Json(notebook)))
}

pub async fn list_notebooks(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let notebooks = state.notes.list_notebooks().await?;
    Ok(Json(notebooks))
}

pub async fn get_notebook(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notebook = state.notes.get_notebook(id).await?;
    Ok(Json(notebook))
}

pub async fn delete_notebook(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.notes.delete_notebook(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
