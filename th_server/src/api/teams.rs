//! Team handlers: creation, lookup and roster management.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use tournament_hub::{
    auth::{Principal, UserId},
    bracket::TeamId,
    competition::{NewTeam, Team, TeamFilter, TeamPlayer, TeamUpdate},
};

use super::{
    AppState,
    competitions::DeletedResponse,
    error::{ApiError, ApiResult, coordinator_error, principal_error},
};

/// Create a team captained by the caller.
///
/// # Errors
///
/// - `400 Bad Request`: Empty or overlong name
/// - `409 Conflict`: Team name already taken
pub async fn create_team(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<NewTeam>,
) -> Result<(StatusCode, Json<Team>), ApiError> {
    let team = state
        .coordinator
        .create_team(&principal, payload)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(State(state): State<AppState>, Path(team_id): Path<TeamId>) -> ApiResult<Team> {
    state
        .coordinator
        .get_team(team_id)
        .await
        .map(Json)
        .map_err(coordinator_error)
}

/// Teams ordered by name; `?player=<user_id>` keeps the teams that user plays for.
pub async fn list_teams(State(state): State<AppState>, Query(filter): Query<TeamFilter>) -> ApiResult<Vec<Team>> {
    state
        .coordinator
        .list_teams(&filter)
        .await
        .map(Json)
        .map_err(coordinator_error)
}

/// Rename a team or change its description.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is neither captain nor admin
/// - `409 Conflict`: New name already taken
pub async fn update_team(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<TeamId>,
    Json(payload): Json<TeamUpdate>,
) -> ApiResult<Team> {
    state
        .coordinator
        .update_team(&principal, team_id, payload)
        .await
        .map(Json)
        .map_err(|e| principal_error(&principal, e))
}

/// Delete a team that is not entered in an upcoming or ongoing competition.
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<TeamId>,
) -> ApiResult<DeletedResponse> {
    state
        .coordinator
        .delete_team(&principal, team_id)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    Ok(Json(DeletedResponse { deleted: true }))
}

/// Add a player to the roster.
///
/// # Request Body
///
/// ```json
/// { "user_id": 42, "position": "Goalkeeper", "jersey_number": 12 }
/// ```
pub async fn add_player(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<TeamId>,
    Json(payload): Json<TeamPlayer>,
) -> Result<(StatusCode, Json<Team>), ApiError> {
    let team = state
        .coordinator
        .add_player(&principal, team_id, payload)
        .await
        .map_err(|e| principal_error(&principal, e))?;

    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn remove_player(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((team_id, user_id)): Path<(TeamId, UserId)>,
) -> ApiResult<Team> {
    state
        .coordinator
        .remove_player(&principal, team_id, user_id)
        .await
        .map(Json)
        .map_err(|e| principal_error(&principal, e))
}
