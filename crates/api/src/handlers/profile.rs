//! The signed-in user's own profile.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use goodshelf_domain::Profile;
use goodshelf_types::User;

use crate::error::{ApiError, ApiResult};
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub username: String,
    /// Required when `new_password` is set.
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// `GET /api/me`.
pub async fn get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Profile>> {
    Ok(Json(state.services.accounts.profile(user.id).await?))
}

/// `PUT /api/me`. Renames the account and optionally changes the password.
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ProfileUpdateRequest>,
) -> ApiResult<Json<User>> {
    let new_password = match (&body.current_password, &body.new_password) {
        (Some(current), Some(new)) => Some((current.as_str(), new.as_str())),
        (None, Some(_)) => {
            return Err(ApiError::BadRequest(
                "current_password is required to change the password".to_string(),
            ));
        }
        _ => None,
    };
    let user = state
        .services
        .accounts
        .update_profile(&user, &body.username, new_password)
        .await?;
    Ok(Json(user))
}
