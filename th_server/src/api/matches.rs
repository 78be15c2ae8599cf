//! Match handlers: listing, manual creation, state changes and result reporting.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use tournament_hub::{
    auth::Principal,
    competition::{ManualMatch, ResultReport},
    matches::{MatchFilter, MatchId, MatchRecord, MatchResult},
};

use super::{
    AppState,
    competitions::DeletedResponse,
    error::{ApiError, ApiResult, coordinator_error, principal_error},
};
use crate::metrics;

/// Matches of every competition, grouped by competition, then round.
pub async fn list_all_matches(
    State(state): State<AppState>,
    Query(filter): Query<MatchFilter>,
) -> ApiResult<Vec<MatchRecord>> {
    state
        .coordinator
        .find_matches(&filter)
        .await
        .map(Json)
        .map_err(coordinator_error)
}

pub async fn get_match(State(state): State<AppState>, Path(match_id): Path<MatchId>) -> ApiResult<MatchRecord> {
    state
        .coordinator
        .get_match(match_id)
        .await
        .map(Json)
        .map_err(coordinator_error)
}

/// Create a match by hand for a competition run without a generated bracket.
///
/// # Errors
///
/// - `400 Bad Request`: Competition has a bracket, team not registered, or a
///   team paired with itself
/// - `403 Forbidden`: Caller does not manage the competition
pub async fn create_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ManualMatch>,
) -> Result<(StatusCode, Json<MatchRecord>), ApiError> {
    let record = state
        .coordinator
        .create_match(&principal, payload)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn start_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<MatchRecord> {
    state
        .coordinator
        .start_match(&principal, match_id)
        .await
        .map(Json)
        .map_err(|e| principal_error(&principal, e))
}

pub async fn cancel_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<MatchRecord> {
    state
        .coordinator
        .cancel_match(&principal, match_id)
        .await
        .map(Json)
        .map_err(|e| principal_error(&principal, e))
}

/// Record the result of a match and advance the winner.
///
/// # Request Body
///
/// ```json
/// { "team1_score": 3, "team2_score": 1, "winner_id": 12 }
/// ```
///
/// # Response
///
/// Returns `200 OK` with the completed match, the successor match if one
/// became playable, and the champion once the final is reported.
///
/// # Errors
///
/// - `400 Bad Request`: Winner did not play in the match
/// - `409 Conflict`: Match already completed or cancelled
/// - `500 Internal Server Error`: Bracket and match records disagree
pub async fn report_result(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<MatchId>,
    Json(payload): Json<MatchResult>,
) -> ApiResult<ResultReport> {
    let report = state
        .coordinator
        .report_result(&principal, match_id, payload)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    metrics::match_results_total(report.champion.is_some());
    if let Some(champion) = &report.champion {
        tracing::info!(
            match_id = report.record.id,
            competition_id = report.record.competition_id,
            "Champion decided: {}",
            champion.name
        );
    }

    Ok(Json(report))
}

pub async fn delete_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<DeletedResponse> {
    state
        .coordinator
        .delete_match(&principal, match_id)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    Ok(Json(DeletedResponse { deleted: true }))
}
