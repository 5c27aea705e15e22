//! Audit event fan-out
//!
//! Every committed store mutation is broadcast, at most once, to the
//! observers currently subscribed (open admin consoles). Delivery is
//! fire-and-forget: a slow or disconnected observer never blocks the
//! mutation that produced the event, and late subscribers get no replay.
//! They reconcile by calling the list endpoint instead.

use tokio::sync::broadcast;

use crate::models::audit_event;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<audit_event::Model>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event to whoever is listening right now.
    /// A send error only means there are no subscribers, which is fine.
    pub fn publish(&self, event: audit_event::Model) {
        let subscribers = self.tx.receiver_count();
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("No observers for audit event: {}", e);
        } else {
            tracing::debug!("Audit event fanned out to {} observer(s)", subscribers);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<audit_event::Model> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(id: &str) -> audit_event::Model {
        audit_event::Model {
            id: 1,
            pending_login_id: id.to_string(),
            actor_kind: "admin".to_string(),
            from_status: Some("pending".to_string()),
            to_status: "approved".to_string(),
            meta: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(sample_event("abc"));
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let mut first = sample_event("abc");
        first.to_status = "otp_required".to_string();
        let mut second = sample_event("abc");
        second.to_status = "approved".to_string();

        bus.publish(first);
        bus.publish(second);

        assert_eq!(rx.recv().await.unwrap().to_status, "otp_required");
        assert_eq!(rx.recv().await.unwrap().to_status, "approved");
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_no_replay() {
        let bus = EventBus::new();
        bus.publish(sample_event("abc"));

        let mut rx = bus.subscribe();
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }
}
