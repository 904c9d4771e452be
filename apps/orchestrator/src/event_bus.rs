// [apps/orchestrator/src/event_bus.rs]
//! Fan-out of alarm state transitions to any number of live subscribers
//! (operator consoles, the escalation timer), grounded on the teacher's
//! `EventBus::dispatch_event_sovereign`: a `broadcast` channel with one
//! funnel point that logs delivery, not an error.

use gridforge_domain_alarms::AlarmEvent;
use tokio::sync::broadcast;
use tracing::trace;

const CHANNEL_CAPACITY: usize = 1024;

/// A subscriber that falls behind the channel capacity receives
/// `MissedEvents(n)` instead of silently skipping forward — the SSE
/// consumer side of C8 surfaces that as a gap so the caller can refetch
/// an authoritative snapshot instead of trusting a hole in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissedEvents(pub u64);

pub struct AlarmEventBus {
    sender: broadcast::Sender<AlarmEvent>,
}

impl AlarmEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlarmEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: AlarmEvent) {
        match self.sender.send(event) {
            Ok(subscriber_count) => trace!(subscribers = subscriber_count, "alarm event dispatched"),
            Err(_) => trace!("alarm event dropped, no subscribers"),
        }
    }
}

impl Default for AlarmEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a `broadcast::Receiver::recv` error onto the caller's choice: a
/// permanently closed bus, or a lag the caller should surface as
/// [`MissedEvents`] and keep reading past.
pub fn classify_recv_error(error: broadcast::error::RecvError) -> Result<MissedEvents, ()> {
    match error {
        broadcast::error::RecvError::Lagged(n) => Ok(MissedEvents(n)),
        broadcast::error::RecvError::Closed => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gridforge_domain_alarms::{Alarm, AlarmEventType, AlarmStatus, OriginatorType, Severity};

    fn event() -> AlarmEvent {
        AlarmEvent {
            event_type: AlarmEventType::Active,
            alarm: Alarm {
                id: "a1".into(),
                tenant_id: "t1".into(),
                rule_id: "r1".into(),
                originator_type: OriginatorType::Station,
                originator_id: "s1".into(),
                severity: Severity::High,
                status: AlarmStatus::Active,
                start_at: Utc::now(),
                end_at: None,
                last_value: 1.0,
                acked_at: None,
                cleared_at: None,
            },
        }
    }

    #[tokio::test]
    async fn a_subscriber_receives_a_published_event() {
        let bus = AlarmEventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(event());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.alarm.id, "a1");
    }

    #[tokio::test]
    async fn publishing_with_no_subscribers_does_not_panic() {
        let bus = AlarmEventBus::new();
        bus.publish(event());
    }
}
