//! Public catalog browsing.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use goodshelf_domain::BookDetail;
use goodshelf_storage::{BookQuery, BookSearchField, BookSort, BookSummary};
use goodshelf_types::{Genre, GenreId, Page, PageRequest};

use crate::error::ApiResult;
use crate::extract::MaybeUser;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 25;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct BookListParams {
    /// Search term, matched against the chosen field.
    pub q: Option<String>,
    pub field: Option<BookSearchField>,
    pub genre: Option<i64>,
    pub sort: Option<BookSort>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub(crate) fn page_request(page: Option<u32>, per_page: Option<u32>, default_size: u32) -> PageRequest {
    PageRequest::new(
        page.unwrap_or(1),
        per_page.unwrap_or(default_size).min(MAX_PAGE_SIZE),
    )
}

/// `GET /api/books`.
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<BookListParams>,
) -> ApiResult<Json<Page<BookSummary>>> {
    let query = BookQuery {
        search: params.q.filter(|q| !q.trim().is_empty()),
        search_field: params.field.unwrap_or_default(),
        genre: params.genre.map(GenreId::new),
        sort: params.sort.unwrap_or_default(),
        page: page_request(params.page, params.per_page, DEFAULT_PAGE_SIZE),
    };
    Ok(Json(state.services.catalog.list_books(&query).await?))
}

/// `GET /api/books/{id}`. Personalized when a session cookie is present.
pub async fn book_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    MaybeUser(viewer): MaybeUser,
) -> ApiResult<Json<BookDetail>> {
    let detail = state
        .services
        .catalog
        .book_detail(id.into(), viewer.map(|u| u.id))
        .await?;
    Ok(Json(detail))
}

/// `GET /api/genres`.
pub async fn list_genres(State(state): State<AppState>) -> ApiResult<Json<Vec<Genre>>> {
    Ok(Json(state.services.catalog.genres().await?))
}
