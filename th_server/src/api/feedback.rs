//! Feedback handlers.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use tournament_hub::{
    auth::Principal,
    feedback::{Feedback, FeedbackFilter, FeedbackId, FeedbackReview, NewFeedback},
};

use super::{
    AppState,
    competitions::DeletedResponse,
    error::{ApiError, ApiResult, principal_error},
};

/// Submit feedback on a competition.
///
/// # Errors
///
/// - `400 Bad Request`: Rating outside 1..=5 or comment length out of range
/// - `404 Not Found`: Unknown competition
/// - `409 Conflict`: Caller already left feedback on this competition
pub async fn submit_feedback(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<NewFeedback>,
) -> Result<(StatusCode, Json<Feedback>), ApiError> {
    let feedback = state
        .feedback
        .submit(&principal, payload)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    Ok((StatusCode::CREATED, Json(feedback)))
}

/// List feedback (admin only), filtered by competition, status or category.
pub async fn list_feedback(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(filter): Query<FeedbackFilter>,
) -> ApiResult<Vec<Feedback>> {
    state
        .feedback
        .list(&principal, &filter)
        .await
        .map(Json)
        .map_err(|e| principal_error(&principal, e))
}

pub async fn get_feedback(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(feedback_id): Path<FeedbackId>,
) -> ApiResult<Feedback> {
    state
        .feedback
        .get(&principal, feedback_id)
        .await
        .map(Json)
        .map_err(|e| principal_error(&principal, e))
}

/// Set the review status or respond to feedback (admin only).
pub async fn review_feedback(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(feedback_id): Path<FeedbackId>,
    Json(payload): Json<FeedbackReview>,
) -> ApiResult<Feedback> {
    state
        .feedback
        .review(&principal, feedback_id, payload)
        .await
        .map(Json)
        .map_err(|e| principal_error(&principal, e))
}

pub async fn delete_feedback(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(feedback_id): Path<FeedbackId>,
) -> ApiResult<DeletedResponse> {
    state
        .feedback
        .delete(&principal, feedback_id)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    Ok(Json(DeletedResponse { deleted: true }))
}
