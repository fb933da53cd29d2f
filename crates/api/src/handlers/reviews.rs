//! Review submission, deletion, and voting.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use goodshelf_domain::VoteReceipt;
use goodshelf_types::{VoteKind, VoteTally};

use crate::error::ApiResult;
use crate::extract::{CurrentUser, MaybeUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub rating: i16,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub kind: VoteKind,
}

/// Vote counts plus the caller's own vote, if signed in and voted.
#[derive(Debug, Serialize)]
pub struct VotesResponse {
    #[serde(flatten)]
    pub tally: VoteTally,
    pub viewer_vote: Option<VoteKind>,
}

/// `POST /api/books/{id}/reviews`. Creates the caller's review of the
/// book, or replaces it (one review per user per book). Replies 201 on a
/// fresh review and 200 on a replacement.
pub async fn submit(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<SubmitReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let (review, created) = state
        .services
        .reviews
        .submit(&user, book_id.into(), body.rating, &body.comment)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(review)))
}

/// `DELETE /api/reviews/{id}`. Author or admin only.
pub async fn delete(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<StatusCode> {
    state.services.reviews.delete(&user, review_id.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/reviews/{id}/vote`. Applies the toggle/change transitions
/// and returns what happened plus the fresh tally.
pub async fn vote(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<VoteRequest>,
) -> ApiResult<Json<VoteReceipt>> {
    let receipt = state
        .services
        .votes
        .cast(user.id, review_id.into(), body.kind)
        .await?;
    Ok(Json(receipt))
}

/// `GET /api/reviews/{id}/votes`.
pub async fn votes(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    MaybeUser(viewer): MaybeUser,
) -> ApiResult<Json<VotesResponse>> {
    let review_id = review_id.into();
    let tally = state.services.votes.tally(review_id).await?;
    let viewer_vote = match viewer {
        Some(user) => state
            .services
            .votes
            .vote_of(user.id, review_id)
            .await?
            .map(|v| v.kind),
        None => None,
    };
    Ok(Json(VotesResponse { tally, viewer_vote }))
}
