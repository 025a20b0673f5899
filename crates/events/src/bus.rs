//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`SessionEvent`]s. It is
//! shared via `Arc<EventBus>` between the queue manager (publisher) and the
//! WebSocket handler and event logger (subscribers).

use chiplabel_core::types::ChipId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Something that changed in the labeling session.
///
/// Constructed via [`SessionEvent::new`] and enriched with the builder
/// methods [`with_session`](SessionEvent::with_session),
/// [`with_chip`](SessionEvent::with_chip), and
/// [`with_payload`](SessionEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Dot-separated event name, e.g. `"chip.activated"`.
    pub event_type: String,

    /// Session that produced the event.
    pub session_id: Option<Uuid>,

    /// Chip the event is about, if any.
    pub chip_id: Option<ChipId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            session_id: None,
            chip_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_chip(mut self, chip_id: ChipId) -> Self {
        self.chip_id = Some(chip_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// ```rust
/// use chiplabel_events::bus::{EventBus, SessionEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(SessionEvent::new("chip.activated"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: SessionEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_types;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let session = Uuid::now_v7();

        let event = SessionEvent::new(event_types::CHIP_ACTIVATED)
            .with_session(session)
            .with_chip(ChipId::from(42))
            .with_payload(serde_json::json!({"zoom": 20}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "chip.activated");
        assert_eq!(received.session_id, Some(session));
        assert_eq!(received.chip_id, Some(ChipId::from(42)));
        assert_eq!(received.payload["zoom"], 20);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(SessionEvent::new(event_types::QUEUE_EMPTY));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.event_type, "queue.empty");
        assert_eq!(e2.event_type, "queue.empty");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(SessionEvent::new(event_types::SESSION_ENDED));
    }

    #[test]
    fn default_event_has_empty_optional_fields() {
        let event = SessionEvent::new("bare.event");
        assert!(event.session_id.is_none());
        assert!(event.chip_id.is_none());
        assert!(event.payload.is_object());
    }

    #[test]
    fn event_serializes_chip_id_as_text() {
        let event = SessionEvent::new(event_types::CHIP_LABELED).with_chip(ChipId::from("c-1"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["chip_id"], "c-1");
        assert_eq!(json["event_type"], "chip.labeled");
    }
}
