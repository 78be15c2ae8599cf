//! Competition, registration and bracket handlers.
//!
//! # Examples
//!
//! Generate the bracket of competition 1:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/competitions/1/bracket \
//!   -H "Authorization: Bearer TOKEN"
//! ```

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tournament_hub::{
    auth::Principal,
    bracket::{Bracket, TeamId},
    competition::{
        Competition, CompetitionFilter, CompetitionId, CompetitionUpdate, NewCompetition, ScheduledBracket,
    },
    matches::{MatchRecord, MatchStatus},
};

use super::{
    AppState,
    error::{ApiError, ApiResult, coordinator_error, principal_error},
    request_id::RequestId,
};
use crate::{logging::log_performance, metrics};

#[derive(Debug, Deserialize)]
pub struct RegisterTeamRequest {
    pub team_id: TeamId,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchesQuery {
    pub status: Option<MatchStatus>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// List competitions, optionally filtered by `status` and `sport`.
///
/// # Response
///
/// Returns `200 OK` with competitions ordered by start date, most recent first.
pub async fn list_competitions(
    State(state): State<AppState>,
    Query(filter): Query<CompetitionFilter>,
) -> ApiResult<Vec<Competition>> {
    state
        .coordinator
        .list_competitions(&filter)
        .await
        .map(Json)
        .map_err(coordinator_error)
}

pub async fn get_competition(
    State(state): State<AppState>,
    Path(competition_id): Path<CompetitionId>,
) -> ApiResult<Competition> {
    state
        .coordinator
        .get_competition(competition_id)
        .await
        .map(Json)
        .map_err(coordinator_error)
}

/// Create a competition owned by the caller.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid name, dates or team limit
/// - `403 Forbidden`: Caller is a participant
pub async fn create_competition(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<NewCompetition>,
) -> Result<(StatusCode, Json<Competition>), ApiError> {
    let competition = state
        .coordinator
        .create_competition(&principal, payload)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    Ok((StatusCode::CREATED, Json(competition)))
}

pub async fn update_competition(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(competition_id): Path<CompetitionId>,
    Json(payload): Json<CompetitionUpdate>,
) -> ApiResult<Competition> {
    state
        .coordinator
        .update_competition(&principal, competition_id, payload)
        .await
        .map(Json)
        .map_err(|e| principal_error(&principal, e))
}

pub async fn delete_competition(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(competition_id): Path<CompetitionId>,
) -> ApiResult<DeletedResponse> {
    state
        .coordinator
        .delete_competition(&principal, competition_id)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    Ok(Json(DeletedResponse { deleted: true }))
}

/// Register a team for a competition.
///
/// # Request Body
///
/// ```json
/// { "team_id": 4 }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Deadline passed, competition full, duplicate
///   registration, or bracket already generated
/// - `404 Not Found`: Unknown competition or team
pub async fn register_team(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(competition_id): Path<CompetitionId>,
    Json(payload): Json<RegisterTeamRequest>,
) -> ApiResult<Competition> {
    state
        .coordinator
        .register_team(&principal, competition_id, payload.team_id)
        .await
        .map(Json)
        .map_err(|e| principal_error(&principal, e))
}

pub async fn get_bracket(
    State(state): State<AppState>,
    Path(competition_id): Path<CompetitionId>,
) -> ApiResult<Bracket> {
    state
        .coordinator
        .get_bracket(competition_id)
        .await
        .map(Json)
        .map_err(coordinator_error)
}

/// Plan the bracket from the registered roster and schedule its playable matches.
///
/// # Response
///
/// Returns `201 Created` with the updated competition and the scheduled matches.
///
/// # Errors
///
/// - `400 Bad Request`: Fewer than two teams, bracket exists, or manual matches exist
/// - `403 Forbidden`: Caller does not manage the competition
pub async fn create_bracket(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    request_id: RequestId,
    Path(competition_id): Path<CompetitionId>,
) -> Result<(StatusCode, Json<ScheduledBracket>), ApiError> {
    let started = Instant::now();
    let scheduled = state
        .coordinator
        .create_bracket(&principal, competition_id)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    record_plan("create_bracket", started, &request_id, &scheduled);
    Ok((StatusCode::CREATED, Json(scheduled)))
}

/// Discard the bracket and plan a new one while no match has started.
pub async fn regenerate_bracket(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    request_id: RequestId,
    Path(competition_id): Path<CompetitionId>,
) -> ApiResult<ScheduledBracket> {
    let started = Instant::now();
    let scheduled = state
        .coordinator
        .regenerate_bracket(&principal, competition_id)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    record_plan("regenerate_bracket", started, &request_id, &scheduled);
    Ok(Json(scheduled))
}

fn record_plan(operation: &str, started: Instant, request_id: &RequestId, scheduled: &ScheduledBracket) {
    let elapsed = started.elapsed();
    metrics::brackets_created_total();
    metrics::bracket_plan_duration_ms(elapsed.as_secs_f64() * 1000.0);

    let metadata = format!(
        "request {} competition {} scheduled {} matches",
        request_id.as_str(),
        scheduled.competition.id,
        scheduled.matches.len()
    );
    log_performance(operation, elapsed.as_millis() as u64, Some(&metadata));
}

/// Matches of a competition sorted by round, then start time.
pub async fn list_matches(
    State(state): State<AppState>,
    Path(competition_id): Path<CompetitionId>,
    Query(query): Query<MatchesQuery>,
) -> ApiResult<Vec<MatchRecord>> {
    state
        .coordinator
        .list_matches(competition_id, query.status)
        .await
        .map(Json)
        .map_err(coordinator_error)
}
