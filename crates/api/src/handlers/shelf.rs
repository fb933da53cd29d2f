//! Personal shelf endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use goodshelf_domain::ShelfBook;
use goodshelf_types::{ReadingStatus, ShelfEntry};

use crate::error::ApiResult;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ShelfListParams {
    pub status: Option<ReadingStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ShelfPutRequest {
    pub status: ReadingStatus,
}

/// `GET /api/shelf`.
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ShelfListParams>,
) -> ApiResult<Json<Vec<ShelfBook>>> {
    Ok(Json(
        state.services.shelf.list(user.id, params.status).await?,
    ))
}

/// `PUT /api/shelf/{book_id}`. Adds the book or updates its status.
pub async fn put(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ShelfPutRequest>,
) -> ApiResult<Json<ShelfEntry>> {
    let entry = state
        .services
        .shelf
        .set_status(user.id, book_id.into(), body.status)
        .await?;
    Ok(Json(entry))
}

/// `DELETE /api/shelf/{book_id}`.
pub async fn remove(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<StatusCode> {
    state.services.shelf.remove(user.id, book_id.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}
