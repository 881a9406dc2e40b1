//! Typed notifications for budget alerts, circuit transitions and mission
//! progress.
//!
//! Subscribers receive events over a `tokio::sync::broadcast` channel. Sending
//! never blocks and never fails when nobody is listening.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::scheduler::MissionStatus;

/// Default channel capacity; slow subscribers observe `Lagged`.
const DEFAULT_CAPACITY: usize = 256;

/// Event published by the router, scheduler or their shared components.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// A tenant's spend (actual or projected) crossed an alert threshold.
    CostAlert {
        tenant: String,
        threshold: f64,
        spent: f64,
        total: f64,
        projected: bool,
    },
    /// A worker's breaker tripped.
    CircuitOpened {
        worker_id: String,
        failure_count: u32,
        next_retry_at: DateTime<Utc>,
    },
    /// A half-open probe succeeded.
    CircuitClosed { worker_id: String },
    /// Mission progress was updated.
    MissionProgress { mission_id: String, progress: u8 },
    /// Mission moved between lifecycle states.
    MissionStatusChanged {
        mission_id: String,
        from: MissionStatus,
        to: MissionStatus,
    },
}

/// Broadcast hub shared by all components of one router/scheduler pair.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RelayEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: RelayEvent) {
        // No receivers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(RelayEvent::CircuitClosed {
            worker_id: "w1".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            RelayEvent::CircuitClosed {
                worker_id: "w1".to_string()
            }
        );
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(RelayEvent::MissionProgress {
            mission_id: "m".to_string(),
            progress: 10,
        });
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = RelayEvent::MissionProgress {
            mission_id: "m1".to_string(),
            progress: 40,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "mission_progress");
        assert_eq!(json["progress"], 40);
    }
}
