//! Notification sinks.
//!
//! Emission is fire-and-forget: a sink never fails the caller, and having
//! nobody listening is normal.

use tokio::sync::broadcast;
use tracing::{debug, info};

use hunter_models::NotificationEvent;

/// Receiver of pipeline notifications.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: NotificationEvent);
}

/// Fans events out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<NotificationEvent>,
}

impl BroadcastEventSink {
    /// Create a sink buffering up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: NotificationEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(receivers) => debug!(event = event_type.as_str(), receivers, "Broadcast event"),
            Err(_) => debug!(event = event_type.as_str(), "No subscribers for event"),
        }
    }
}

/// Writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: NotificationEvent) {
        info!(
            event = event.event_type().as_str(),
            collection = %event.collection,
            content_id = %event.content_id(),
            payload = %serde_json::to_string(&event).unwrap_or_default(),
            "Notification"
        );
    }
}

/// Discards events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: NotificationEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunter_models::{ContentStatus, EventType};

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscribers() {
        let sink = BroadcastEventSink::new(8);
        let mut rx = sink.subscribe();

        sink.emit(NotificationEvent::item_added("project", "abc", "Title"));
        sink.emit(NotificationEvent::status_changed(
            "project",
            "abc",
            ContentStatus::Pending,
            ContentStatus::Queued,
            None,
        ));

        assert_eq!(rx.recv().await.unwrap().event_type(), EventType::ItemAdded);
        assert_eq!(rx.recv().await.unwrap().event_type(), EventType::StatusChanged);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let sink = BroadcastEventSink::default();
        sink.emit(NotificationEvent::item_added("project", "abc", "Title"));
        TracingEventSink.emit(NotificationEvent::item_added("project", "abc", "Title"));
        NullEventSink.emit(NotificationEvent::item_added("project", "abc", "Title"));
    }
}
