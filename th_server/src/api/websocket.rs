//! WebSocket stream of competition and match change events.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws` or `GET /ws?competition_id=<id>`
//! 2. Server subscribes to the coordinator's event bus
//! 3. Every matching [`ChangeEvent`] is pushed as a JSON text frame
//! 4. The stream ends when the client closes the socket or the server shuts down
//!
//! Events are advisory. A client that falls behind skips the events it missed
//! and keeps receiving new ones.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws?competition_id=1');
//!
//! ws.onmessage = (event) => {
//!   const change = JSON.parse(event.data);
//!   if (change.topic === "match" && change.kind === "update") {
//!     refreshMatch(change.payload);
//!   }
//! };
//! ```

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tournament_hub::{ChangeEvent, competition::CompetitionId};

use super::AppState;
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Only forward events of this competition
    pub competition_id: Option<CompetitionId>,
}

impl WsQuery {
    fn accepts(&self, event: &ChangeEvent) -> bool {
        self.competition_id.is_none_or(|id| event.competition_id == id)
    }
}

/// Upgrade HTTP connection to a change event stream.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, query, state))
}

/// Forward bus events to the socket until either side goes away.
async fn handle_socket(socket: WebSocket, query: WsQuery, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let events = state.coordinator.events();
    let mut subscription = events.subscribe();

    metrics::websocket_connections_total();
    metrics::websocket_connections_active(events.subscriber_count());
    info!("WebSocket subscribed: competition={:?}", query.competition_id);

    loop {
        tokio::select! {
            received = subscription.recv() => match received {
                Ok(event) => {
                    if !query.accepts(&event) {
                        continue;
                    }

                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to serialize change event: {}", e);
                            continue;
                        }
                    };

                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(other)) => debug!("Ignoring inbound WebSocket frame: {:?}", other),
            },
        }
    }

    drop(subscription);
    metrics::websocket_connections_active(events.subscriber_count());
    info!("WebSocket closed: competition={:?}", query.competition_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tournament_hub::events::{ChangeKind, EventTopic};

    fn event(competition_id: CompetitionId) -> ChangeEvent {
        ChangeEvent::new(EventTopic::Match, ChangeKind::Update, competition_id, 1, &competition_id)
    }

    #[test]
    fn test_query_filters_by_competition() {
        let query = WsQuery {
            competition_id: Some(3),
        };
        assert!(query.accepts(&event(3)));
        assert!(!query.accepts(&event(4)));

        assert!(WsQuery::default().accepts(&event(4)));
    }
}
