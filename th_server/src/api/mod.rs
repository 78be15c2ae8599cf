//! HTTP/WebSocket API for the tournament server.
//!
//! # Modules
//!
//! - [`competitions`]: Competitions, team registration, brackets and match listings
//! - [`matches`]: Match listing, manual matches, state changes and result reporting
//! - [`teams`]: Teams and their rosters
//! - [`feedback`]: Competition feedback and admin review
//! - [`websocket`]: Live change event stream
//! - [`middleware`]: JWT authentication and request metrics
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `GET /health` - Server health status
//! - `GET /api/v1/competitions` - List competitions (`?status=&sport=&team=`)
//! - `GET /api/v1/competitions/{id}` - Competition details
//! - `GET /api/v1/competitions/{id}/bracket` - Planned bracket
//! - `GET /api/v1/competitions/{id}/matches` - Matches (`?status=`)
//! - `GET /api/v1/matches` - Matches of all competitions (`?competition_id=&status=`)
//! - `GET /api/v1/matches/{id}`
//! - `GET /api/v1/teams` - Teams by name (`?player=`)
//! - `GET /api/v1/teams/{id}`
//! - `GET /ws?competition_id=<id>` - Change event stream
//!
//! ## Protected (Bearer JWT)
//! - `POST /api/v1/competitions`, `PUT|DELETE /api/v1/competitions/{id}`
//! - `POST /api/v1/competitions/{id}/register`
//! - `POST /api/v1/competitions/{id}/bracket`
//! - `POST /api/v1/competitions/{id}/bracket/regenerate`
//! - `POST /api/v1/matches`, `DELETE /api/v1/matches/{id}`
//! - `PUT /api/v1/matches/{id}/result`
//! - `POST /api/v1/matches/{id}/start`, `POST /api/v1/matches/{id}/cancel`
//! - `POST /api/v1/teams`, `PUT|DELETE /api/v1/teams/{id}`
//! - `POST /api/v1/teams/{id}/players`, `DELETE /api/v1/teams/{id}/players/{user_id}`
//! - `POST|GET /api/v1/feedback`, `GET|PUT|DELETE /api/v1/feedback/{id}`
//!
//! # CORS
//!
//! CORS is configured permissively. In production, restrict origins at the proxy.

pub mod competitions;
pub mod error;
pub mod feedback;
pub mod matches;
pub mod middleware;
pub mod request_id;
pub mod teams;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
};
use serde_json::json;
use std::sync::Arc;
use tokio::time::{Duration, timeout};
use tower_http::cors::CorsLayer;
use tournament_hub::{FeedbackManager, TournamentCoordinator, auth::TokenVerifier};

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloned for each request; every field is behind an `Arc`. The change event
/// bus is reached through the coordinator.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<TournamentCoordinator>,
    pub feedback: Arc<FeedbackManager>,
    pub verifier: Arc<TokenVerifier>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use th_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:6969").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .route_layer(axum::middleware::from_fn(middleware::metrics_middleware))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/competitions", get(competitions::list_competitions))
        .route("/competitions/{id}", get(competitions::get_competition))
        .route("/competitions/{id}/bracket", get(competitions::get_bracket))
        .route("/competitions/{id}/matches", get(competitions::list_matches))
        .route("/matches", get(matches::list_all_matches))
        .route("/matches/{id}", get(matches::get_match))
        .route("/teams", get(teams::list_teams))
        .route("/teams/{id}", get(teams::get_team));

    // Shares paths with public routes; the auth layer wraps only these methods.
    let protected_routes = Router::new()
        .route("/competitions", post(competitions::create_competition))
        .route(
            "/competitions/{id}",
            put(competitions::update_competition).delete(competitions::delete_competition),
        )
        .route("/competitions/{id}/register", post(competitions::register_team))
        .route("/competitions/{id}/bracket", post(competitions::create_bracket))
        .route(
            "/competitions/{id}/bracket/regenerate",
            post(competitions::regenerate_bracket),
        )
        .route("/matches", post(matches::create_match))
        .route("/matches/{id}", delete(matches::delete_match))
        .route("/matches/{id}/result", put(matches::report_result))
        .route("/matches/{id}/start", post(matches::start_match))
        .route("/matches/{id}/cancel", post(matches::cancel_match))
        .route("/teams", post(teams::create_team))
        .route("/teams/{id}", put(teams::update_team).delete(teams::delete_team))
        .route("/teams/{id}/players", post(teams::add_player))
        .route("/teams/{id}/players/{user_id}", delete(teams::remove_player))
        .route(
            "/feedback",
            post(feedback::submit_feedback).get(feedback::list_feedback),
        )
        .route(
            "/feedback/{id}",
            get(feedback::get_feedback)
                .put(feedback::review_feedback)
                .delete(feedback::delete_feedback),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store answers within two seconds, otherwise
/// `503 Service Unavailable`.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","storage":true,"subscribers":0,"timestamp":"2026-01-10T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let ping = state.coordinator.store().get_competition(0);
    let storage_healthy = matches!(timeout(Duration::from_secs(2), ping).await, Ok(Ok(_)));

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_healthy,
        "subscribers": state.coordinator.events().subscriber_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
