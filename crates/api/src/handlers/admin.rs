//! Admin management surface. Role checks live in the domain services;
//! these handlers only shape requests and responses.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use goodshelf_domain::UserOverview;
use goodshelf_storage::{NewBook, ReviewQuery, ReviewRecord, ReviewSort, UserFilter};
use goodshelf_types::{AccountStatus, Book, Genre, GenreId, Page, Role};

use crate::error::ApiResult;
use crate::extract::CurrentUser;
use crate::handlers::catalog::page_request;
use crate::state::AppState;

const ADMIN_PAGE_SIZE: u32 = 15;
const MODERATION_PAGE_SIZE: u32 = 10;

// === Users ===

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub q: Option<String>,
    pub status: Option<AccountStatus>,
    pub role: Option<Role>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: AccountStatus,
}

/// Password re-entry payload for the destructive user operations.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub password: String,
}

/// `GET /api/admin/users`.
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(params): Query<UserListParams>,
) -> ApiResult<Json<Page<UserOverview>>> {
    let filter = UserFilter {
        username_contains: params.q.filter(|q| !q.trim().is_empty()),
        status: params.status,
        role: params.role,
        page: page_request(params.page, params.per_page, ADMIN_PAGE_SIZE),
    };
    Ok(Json(
        state.services.accounts.list_users(&actor, &filter).await?,
    ))
}

/// `POST /api/admin/users/{id}/status`.
pub async fn set_status(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<StatusRequest>,
) -> ApiResult<StatusCode> {
    state
        .services
        .accounts
        .set_status(&actor, user_id.into(), body.status)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/users/{id}/promote`. Requires the acting admin's own
/// password.
pub async fn promote(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<ConfirmRequest>,
) -> ApiResult<StatusCode> {
    state
        .services
        .accounts
        .promote(&actor, user_id.into(), &body.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/admin/users/{id}`. Requires the acting admin's own
/// password; also closes the target's open sessions.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<ConfirmRequest>,
) -> ApiResult<StatusCode> {
    let target = user_id.into();
    state
        .services
        .accounts
        .delete_user(&actor, target, &body.password)
        .await?;
    state.sessions.remove_user(target);
    Ok(StatusCode::NO_CONTENT)
}

// === Reviews ===

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListParams {
    pub rating: Option<i16>,
    pub q: Option<String>,
    pub sort: Option<ReviewSort>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// `GET /api/admin/reviews`.
pub async fn list_reviews(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(params): Query<ReviewListParams>,
) -> ApiResult<Json<Page<ReviewRecord>>> {
    let query = ReviewQuery {
        rating: params.rating,
        search: params.q.filter(|q| !q.trim().is_empty()),
        sort: params.sort.unwrap_or_default(),
        page: page_request(params.page, params.per_page, MODERATION_PAGE_SIZE),
    };
    Ok(Json(
        state
            .services
            .reviews
            .moderation_list(&actor, &query)
            .await?,
    ))
}

// === Books ===

#[derive(Debug, Deserialize)]
pub struct BookPayload {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub publish_year: Option<i32>,
    pub cover_url: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}

impl BookPayload {
    fn into_new_book(self) -> NewBook {
        NewBook {
            title: self.title,
            author: self.author,
            description: self.description,
            publish_year: self.publish_year,
            cover_url: self.cover_url,
            genre_ids: self.genre_ids.into_iter().map(GenreId::new).collect(),
        }
    }
}

/// `POST /api/admin/books`.
pub async fn create_book(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<BookPayload>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let book = state
        .services
        .catalog
        .create_book(&actor, &body.into_new_book())
        .await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// `PUT /api/admin/books/{id}`.
pub async fn update_book(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<BookPayload>,
) -> ApiResult<Json<Book>> {
    let book = state
        .services
        .catalog
        .update_book(&actor, book_id.into(), &body.into_new_book())
        .await?;
    Ok(Json(book))
}

/// `DELETE /api/admin/books/{id}`.
pub async fn delete_book(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    CurrentUser(actor): CurrentUser,
) -> ApiResult<StatusCode> {
    state
        .services
        .catalog
        .delete_book(&actor, book_id.into())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// === Genres ===

#[derive(Debug, Deserialize)]
pub struct GenrePayload {
    pub name: String,
}

/// `POST /api/admin/genres`.
pub async fn create_genre(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<GenrePayload>,
) -> ApiResult<(StatusCode, Json<Genre>)> {
    let genre = state
        .services
        .catalog
        .create_genre(&actor, &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

/// `PUT /api/admin/genres/{id}`.
pub async fn rename_genre(
    State(state): State<AppState>,
    Path(genre_id): Path<i64>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<GenrePayload>,
) -> ApiResult<Json<Genre>> {
    let genre = state
        .services
        .catalog
        .rename_genre(&actor, genre_id.into(), &body.name)
        .await?;
    Ok(Json(genre))
}

/// `DELETE /api/admin/genres/{id}`.
pub async fn delete_genre(
    State(state): State<AppState>,
    Path(genre_id): Path<i64>,
    CurrentUser(actor): CurrentUser,
) -> ApiResult<StatusCode> {
    state
        .services
        .catalog
        .delete_genre(&actor, genre_id.into())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
