//! In-process event bus.
//!
//! A `tokio::sync::broadcast` channel carrying [`Event`] values. The
//! `/events` endpoint, the plugin registry and the RPA runner publish to it;
//! the SSE stream subscribes. Events sent while nobody listens are dropped.

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::Event;

/// Buffer size of the broadcast channel
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Cloneable handle to the shared event channel
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Sends an event to every current subscriber
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, event: Event) -> usize {
        let event_type = event.event_type.clone();
        let delivered = self.sender.send(event).unwrap_or(0);
        debug!(event_type = %event_type, delivered, "Published event");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(Event::new("noop", "test", json!({}))), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(Event::new("a", "test", json!({"n": 1})));
        bus.publish(Event::new("b", "test", json!({"n": 2})));

        assert_eq!(first.recv().await.unwrap().event_type, "a");
        assert_eq!(first.recv().await.unwrap().event_type, "b");
        assert_eq!(second.recv().await.unwrap().data["n"], 1);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for n in 0..4 {
            bus.publish(Event::new("tick", "test", json!({"n": n})));
        }
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Lagged(2))));
        assert_eq!(rx.recv().await.unwrap().data["n"], 2);
    }
}
