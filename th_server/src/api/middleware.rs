//! Authentication and metrics middleware.
//!
//! # Extracting the caller
//!
//! Protected handlers read the verified identity from request extensions:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use tournament_hub::auth::Principal;
//!
//! async fn protected_handler(Extension(principal): Extension<Principal>) -> String {
//!     format!("Authenticated as user {} ({})", principal.id, principal.role)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{MatchedPath, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tournament_hub::auth::AuthError;

use super::{
    AppState,
    error::{ApiError, auth_error},
};
use crate::metrics;

/// Authentication middleware that validates JWT tokens and injects the caller.
///
/// Expects `Authorization: Bearer <token>`. On success a
/// [`Principal`](tournament_hub::auth::Principal) is added to the request
/// extensions; a missing, malformed or expired token yields `401 Unauthorized`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)
        .map_err(auth_error)?;

    let principal = state.verifier.verify_bearer(header).map_err(auth_error)?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Count every request by method, matched route and status
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let response = next.run(request).await;
    metrics::http_requests_total(&method, &path, response.status().as_u16());
    response
}
