//! Mapping of service errors onto HTTP responses.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use tournament_hub::{
    auth::{AuthError, Principal},
    matches::MatchError,
    CoordinatorError,
};

use crate::logging::log_security_event;

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Handler result carrying a JSON body
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build an error response with the given status and message
pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// HTTP status for a coordinator error
pub fn status_for(err: &CoordinatorError) -> StatusCode {
    match err {
        CoordinatorError::Validation(_) => StatusCode::BAD_REQUEST,
        CoordinatorError::CompetitionNotFound(_)
        | CoordinatorError::TeamNotFound(_)
        | CoordinatorError::PlayerNotFound { .. }
        | CoordinatorError::MatchNotFound(_)
        | CoordinatorError::FeedbackNotFound(_)
        | CoordinatorError::BracketNotFound(_) => StatusCode::NOT_FOUND,
        CoordinatorError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoordinatorError::Conflict(_) => StatusCode::CONFLICT,
        CoordinatorError::Match(MatchError::InvalidStateTransition { .. }) => StatusCode::CONFLICT,
        CoordinatorError::Match(MatchError::InvalidWinner(_)) => StatusCode::BAD_REQUEST,
        CoordinatorError::Bracket(_) | CoordinatorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a coordinator error into a sanitized response
pub fn coordinator_error(err: CoordinatorError) -> ApiError {
    if err.is_internal() {
        tracing::error!(error = %err, "Request failed with internal error");
    }
    api_error(status_for(&err), err.client_message())
}

/// Like [`coordinator_error`], recording authorization denials for `principal`
pub fn principal_error(principal: &Principal, err: CoordinatorError) -> ApiError {
    if let CoordinatorError::Forbidden(reason) = &err {
        log_security_event("forbidden", Some(principal.id), reason);
    }
    coordinator_error(err)
}

/// Convert a token failure into a 401 response
pub fn auth_error(err: AuthError) -> ApiError {
    log_security_event("unauthenticated", None, &err.to_string());
    api_error(StatusCode::UNAUTHORIZED, err.client_message())
}
