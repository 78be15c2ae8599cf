//! Integration tests for the HTTP/WebSocket server.
//!
//! The router is built against the in-memory store and driven with
//! `tower::ServiceExt::oneshot`; the WebSocket test serves it on a real socket.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use futures_util::StreamExt;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use th_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use tokio::time::timeout;
use tournament_hub::{
    EventBus, FeedbackManager, TournamentCoordinator,
    auth::{Role, TokenVerifier},
    db::{InMemoryStore, Store},
};
use tower::ServiceExt; // For `oneshot` method

const SECRET: &str = "test_secret_key_for_testing_only_32+";

struct TestServer {
    app: Router,
    state: AppState,
    verifier: Arc<TokenVerifier>,
}

impl TestServer {
    fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let verifier = Arc::new(TokenVerifier::new(SECRET, 60).unwrap());
        let state = AppState {
            coordinator: Arc::new(TournamentCoordinator::with_seed(
                store.clone(),
                EventBus::default(),
                7,
            )),
            feedback: Arc::new(FeedbackManager::new(store)),
            verifier: verifier.clone(),
        };

        Self {
            app: create_router(state.clone()),
            state,
            verifier,
        }
    }

    fn token(&self, user_id: i64, role: Role) -> String {
        self.verifier.issue(user_id, role).unwrap()
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn create_competition(&self, token: &str) -> i64 {
        let start = Utc::now() + Duration::days(7);
        let (status, body) = self
            .send(
                "POST",
                "/api/v1/competitions",
                Some(token),
                Some(json!({
                    "name": "Spring Cup",
                    "sport": "Basketball",
                    "start_date": start,
                    "end_date": start + Duration::days(2),
                    "registration_deadline": start - Duration::days(1),
                    "max_teams": 8
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    /// Create `n` teams with distinct captains and register them
    async fn register_teams(&self, competition_id: i64, n: i64) {
        for i in 1..=n {
            let token = self.token(100 + i, Role::Participant);
            let (status, team) = self
                .send(
                    "POST",
                    "/api/v1/teams",
                    Some(&token),
                    Some(json!({ "name": format!("Team {i}") })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);

            let (status, _) = self
                .send(
                    "POST",
                    &format!("/api/v1/competitions/{competition_id}/register"),
                    Some(&token),
                    Some(json!({ "team_id": team["id"] })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
    }
}

fn team1_wins(record: &Value) -> Value {
    json!({
        "team1_score": 3,
        "team2_score": 1,
        "winner_id": record["team1"]["team"]["id"]
    })
}

// ============================================================================
// Health and middleware
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let server = TestServer::new();
    let (status, body) = server.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], true);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = TestServer::new();
    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "abc-123")
        .body(Body::empty())
        .unwrap();

    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "abc-123");

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_protected_route_requires_token() {
    let server = TestServer::new();
    let (status, body) = server
        .send("POST", "/api/v1/teams", None, Some(json!({ "name": "Ghosts" })))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_invalid_token_rejected_without_details() {
    let server = TestServer::new();
    let (status, body) = server
        .send(
            "POST",
            "/api/v1/teams",
            Some("not.a.jwt"),
            Some(json!({ "name": "Ghosts" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication failed");
}

#[tokio::test]
async fn test_public_reads_need_no_token() {
    let server = TestServer::new();
    let (status, body) = server.send("GET", "/api/v1/competitions", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_participant_cannot_create_competition() {
    let server = TestServer::new();
    let token = server.token(1, Role::Participant);
    let start = Utc::now() + Duration::days(7);

    let (status, _) = server
        .send(
            "POST",
            "/api/v1/competitions",
            Some(&token),
            Some(json!({
                "name": "Backyard Cup",
                "sport": "Tennis",
                "start_date": start,
                "end_date": start,
                "registration_deadline": start,
                "max_teams": 4
            })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ============================================================================
// Tournament flow
// ============================================================================

#[tokio::test]
async fn test_four_team_competition_to_champion() {
    let server = TestServer::new();
    let organizer = server.token(10, Role::Organizer);
    let competition_id = server.create_competition(&organizer).await;
    server.register_teams(competition_id, 4).await;

    let (status, scheduled) = server
        .send(
            "POST",
            &format!("/api/v1/competitions/{competition_id}/bracket"),
            Some(&organizer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(scheduled["competition"]["status"], "ongoing");
    let round_one = scheduled["matches"].as_array().unwrap().clone();
    assert_eq!(round_one.len(), 2);

    let (status, bracket) = server
        .send(
            "GET",
            &format!("/api/v1/competitions/{competition_id}/bracket"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bracket["rounds"], 2);
    assert_eq!(bracket["slots"].as_array().unwrap().len(), 3);

    let (status, first) = server
        .send(
            "PUT",
            &format!("/api/v1/matches/{}/result", round_one[0]["id"]),
            Some(&organizer),
            Some(team1_wins(&round_one[0])),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["match"]["status"], "completed");
    assert!(first["next_match"].is_null());

    let (status, second) = server
        .send(
            "PUT",
            &format!("/api/v1/matches/{}/result", round_one[1]["id"]),
            Some(&organizer),
            Some(team1_wins(&round_one[1])),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let final_match = second["next_match"].clone();
    assert_eq!(final_match["round"], 2);
    assert_eq!(final_match["match_number"], 1);

    let (status, last) = server
        .send(
            "PUT",
            &format!("/api/v1/matches/{}/result", final_match["id"]),
            Some(&organizer),
            Some(team1_wins(&final_match)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last["champion"]["id"], final_match["team1"]["team"]["id"]);
    assert!(last["next_match"].is_null());

    let (_, competition) = server
        .send("GET", &format!("/api/v1/competitions/{competition_id}"), None, None)
        .await;
    assert_eq!(competition["status"], "completed");

    let (status, completed) = server
        .send(
            "GET",
            &format!("/api/v1/competitions/{competition_id}/matches?status=completed"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_result_errors_map_to_status_codes() {
    let server = TestServer::new();
    let organizer = server.token(10, Role::Organizer);
    let competition_id = server.create_competition(&organizer).await;
    server.register_teams(competition_id, 2).await;

    let (_, scheduled) = server
        .send(
            "POST",
            &format!("/api/v1/competitions/{competition_id}/bracket"),
            Some(&organizer),
            None,
        )
        .await;
    let record = scheduled["matches"][0].clone();
    let uri = format!("/api/v1/matches/{}/result", record["id"]);

    let (status, _) = server
        .send(
            "PUT",
            &uri,
            Some(&organizer),
            Some(json!({ "team1_score": 1, "team2_score": 0, "winner_id": 9999 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let outsider = server.token(11, Role::Organizer);
    let (status, _) = server
        .send("PUT", &uri, Some(&outsider), Some(team1_wins(&record)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .send("PUT", &uri, Some(&organizer), Some(team1_wins(&record)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .send("PUT", &uri, Some(&organizer), Some(team1_wins(&record)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_bracket_needs_two_teams() {
    let server = TestServer::new();
    let organizer = server.token(10, Role::Organizer);
    let competition_id = server.create_competition(&organizer).await;
    server.register_teams(competition_id, 1).await;

    let (status, body) = server
        .send(
            "POST",
            &format!("/api/v1/competitions/{competition_id}/bracket"),
            Some(&organizer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_resources_are_not_found() {
    let server = TestServer::new();

    let (status, _) = server.send("GET", "/api/v1/competitions/404", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.send("GET", "/api/v1/matches/404", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.send("GET", "/api/v1/teams/404", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let organizer = server.token(10, Role::Organizer);
    let competition_id = server.create_competition(&organizer).await;
    let (status, _) = server
        .send(
            "GET",
            &format!("/api/v1/competitions/{competition_id}/bracket"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_team_name_conflicts() {
    let server = TestServer::new();
    let token = server.token(1, Role::Participant);

    let (status, _) = server
        .send("POST", "/api/v1/teams", Some(&token), Some(json!({ "name": "Owls" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = server
        .send("POST", "/api/v1/teams", Some(&token), Some(json!({ "name": "Owls" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_team_roster_endpoints() {
    let server = TestServer::new();
    let captain = server.token(30, Role::Participant);
    let stranger = server.token(31, Role::Participant);

    let (status, team) = server
        .send("POST", "/api/v1/teams", Some(&captain), Some(json!({ "name": "Herons" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(team["players"][0]["user_id"], 30);
    let team_uri = format!("/api/v1/teams/{}", team["id"]);

    let player = json!({ "user_id": 32, "position": "Setter", "jersey_number": 4 });
    let (status, _) = server
        .send("POST", &format!("{team_uri}/players"), Some(&stranger), Some(player.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = server
        .send("POST", &format!("{team_uri}/players"), Some(&captain), Some(player.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(updated["players"].as_array().unwrap().len(), 2);

    let (status, _) = server
        .send("POST", &format!("{team_uri}/players"), Some(&captain), Some(player))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, listed) = server.send("GET", "/api/v1/teams?player=32", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "Herons");

    let (status, renamed) = server
        .send("PUT", &team_uri, Some(&captain), Some(json!({ "name": "Grey Herons" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Grey Herons");

    let (status, _) = server
        .send("DELETE", &format!("{team_uri}/players/32"), Some(&captain), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server
        .send("DELETE", &format!("{team_uri}/players/32"), Some(&captain), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.send("DELETE", &team_uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, deleted) = server.send("DELETE", &team_uri, Some(&captain), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], true);

    let (status, _) = server.send("GET", &team_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_matches_listed_across_competitions() {
    let server = TestServer::new();
    let organizer = server.token(10, Role::Organizer);
    let competition_id = server.create_competition(&organizer).await;
    server.register_teams(competition_id, 4).await;

    let (status, _) = server
        .send(
            "POST",
            &format!("/api/v1/competitions/{competition_id}/bracket"),
            Some(&organizer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, all) = server.send("GET", "/api/v1/matches", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, filtered) = server
        .send(
            "GET",
            &format!("/api/v1/matches?competition_id={competition_id}&status=completed"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(filtered.as_array().unwrap().is_empty());
}

// ============================================================================
// Feedback
// ============================================================================

#[tokio::test]
async fn test_feedback_submission_and_admin_review() {
    let server = TestServer::new();
    let organizer = server.token(10, Role::Organizer);
    let competition_id = server.create_competition(&organizer).await;

    let participant = server.token(20, Role::Participant);
    let (status, feedback) = server
        .send(
            "POST",
            "/api/v1/feedback",
            Some(&participant),
            Some(json!({
                "competition_id": competition_id,
                "rating": 4,
                "comment": "Well organized",
                "category": "organization"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(feedback["status"], "pending");

    let (status, _) = server
        .send("GET", "/api/v1/feedback", Some(&participant), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = server.token(1, Role::Admin);
    let (status, listed) = server
        .send(
            "GET",
            &format!("/api/v1/feedback?competition_id={competition_id}&status=pending"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, reviewed) = server
        .send(
            "PUT",
            &format!("/api/v1/feedback/{}", feedback["id"]),
            Some(&admin),
            Some(json!({ "status": "resolved", "admin_response": "Thanks!" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "resolved");

    let (status, own) = server
        .send(
            "GET",
            &format!("/api/v1/feedback/{}", feedback["id"]),
            Some(&participant),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["admin_response"], "Thanks!");

    let uri = format!("/api/v1/feedback/{}", feedback["id"]);
    let (status, _) = server.send("DELETE", &uri, Some(&participant), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, deleted) = server.send("DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], true);

    let (status, _) = server.send("GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// WebSocket
// ============================================================================

#[tokio::test]
async fn test_websocket_streams_change_events() {
    let server = TestServer::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server.app.clone();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();

    // The subscription is made after the upgrade completes
    let events = server.state.coordinator.events().clone();
    timeout(std::time::Duration::from_secs(5), async {
        while events.subscriber_count() == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let organizer = server.token(10, Role::Organizer);
    let competition_id = server.create_competition(&organizer).await;

    let message = timeout(std::time::Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let event: Value = serde_json::from_str(message.to_text().unwrap()).unwrap();

    assert_eq!(event["topic"], "competition");
    assert_eq!(event["kind"], "create");
    assert_eq!(event["competition_id"], competition_id);
}
