//! Change notifications for competitions and matches.
//!
//! Events are advisory: publishing never fails the operation that produced
//! them, and subscribers that fall behind simply miss events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::competition::CompetitionId;

/// Default capacity of the broadcast channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// What kind of entity changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTopic {
    Competition,
    Match,
}

/// How it changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// A change published to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub topic: EventTopic,
    pub kind: ChangeKind,
    pub competition_id: CompetitionId,
    pub organizer_id: i64,
    /// Serialized entity (or its ID for deletions)
    pub payload: serde_json::Value,
}

impl ChangeEvent {
    /// Build an event from any serializable entity
    pub fn new<T: Serialize>(
        topic: EventTopic,
        kind: ChangeKind,
        competition_id: CompetitionId,
        organizer_id: i64,
        entity: &T,
    ) -> Self {
        let payload = serde_json::to_value(entity).unwrap_or_else(|e| {
            log::warn!("Failed to serialize {:?} event payload: {}", topic, e);
            serde_json::Value::Null
        });

        Self {
            topic,
            kind,
            competition_id,
            organizer_id,
            payload,
        }
    }
}

/// Fan-out channel for change events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to current subscribers.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                log::trace!(
                    "No subscribers for {:?} {:?} event on competition {}",
                    event.topic,
                    event.kind,
                    event.competition_id
                );
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        let event = ChangeEvent::new(EventTopic::Match, ChangeKind::Delete, 1, 2, &7);
        assert_eq!(bus.publish(event), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = ChangeEvent::new(
            EventTopic::Competition,
            ChangeKind::Update,
            5,
            9,
            &serde_json::json!({"status": "ongoing"}),
        );
        assert_eq!(bus.publish(event.clone()), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
        assert_eq!(received.payload["status"], "ongoing");
    }

    #[test]
    fn test_event_wire_format() {
        let event = ChangeEvent::new(EventTopic::Match, ChangeKind::Create, 3, 4, &"x");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["topic"], "match");
        assert_eq!(json["kind"], "create");
        assert_eq!(json["competition_id"], 3);
        assert_eq!(json["organizer_id"], 4);
    }
}
