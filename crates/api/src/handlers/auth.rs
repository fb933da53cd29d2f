//! Registration, login, and logout.

use axum::Json;
use axum::extract::State;
use axum::http::header::{HeaderMap, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse};
use serde::Deserialize;

use goodshelf_types::User;

use crate::error::ApiResult;
use crate::sessions::{SESSION_COOKIE, token_from_headers};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

// `use<>`: nothing in the response borrows `state`; without it the
// edition-2024 capture rules would tie the return value to the borrow.
fn signed_in(state: &AppState, user: User, status: StatusCode) -> impl IntoResponse + use<> {
    let token = state.sessions.create(user.id);
    (
        status,
        AppendHeaders([(SET_COOKIE, session_cookie(&token))]),
        Json(user),
    )
}

/// `POST /api/auth/register`. Creates the account and signs it in.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .services
        .accounts
        .register(&body.username, &body.password, &body.confirm_password)
        .await?;
    Ok(signed_in(&state, user, StatusCode::CREATED))
}

/// `POST /api/auth/login`.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .services
        .accounts
        .login(&body.username, &body.password)
        .await?;
    Ok(signed_in(&state, user, StatusCode::OK))
}

/// `POST /api/auth/logout`. Always succeeds, valid session or not.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = token_from_headers(&headers) {
        state.sessions.remove(&token);
    }
    (
        StatusCode::NO_CONTENT,
        AppendHeaders([(SET_COOKIE, expired_cookie())]),
    )
}
