//! Session-cookie extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use goodshelf_types::User;

use crate::error::ApiError;
use crate::sessions::token_from_headers;
use crate::state::AppState;

/// The signed-in user. Rejects the request with 401 when the session
/// cookie is missing, expired, or points at a deleted account.
pub struct CurrentUser(pub User);

/// The signed-in user if any. Never rejects; anonymous requests get `None`.
pub struct MaybeUser(pub Option<User>);

async fn lookup(parts: &Parts, state: &AppState) -> Option<User> {
    let token = token_from_headers(&parts.headers)?;
    let user_id = state.sessions.resolve(&token)?;
    match state.services.accounts.profile(user_id).await {
        Ok(profile) => Some(profile.user),
        Err(_) => {
            // The account vanished out from under the session.
            state.sessions.remove(&token);
            None
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        lookup(parts, state)
            .await
            .map(CurrentUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(lookup(parts, state).await))
    }
}
