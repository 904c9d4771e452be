// [libs/domain/alarms/src/escalation.rs]
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::alarm::{Alarm, AlarmEventType, AlarmStatus};

/// An alarm is escalation-eligible once its severity clears the bar and it
/// has remained ACTIVE past the configured delay (spec.md §4.8 step 6,
/// §9 "Escalation timers"). The timer itself — a per-alarm deadline map —
/// lives with the rest of the orchestrator's background tasks; this
/// function is the pure predicate the timer re-checks on fire.
pub fn should_escalate(alarm: &Alarm, now: DateTime<Utc>, escalation_delay: Duration) -> bool {
    alarm.status == AlarmStatus::Active && alarm.severity.is_escalation_eligible() && now - alarm.start_at >= escalation_delay
}

/// Suppresses duplicate notifications of the same (alarm_id, event_type)
/// within a cooldown window (spec.md §4.8 step 6).
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_sent: HashMap<(String, AlarmEventType), DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this (alarm, event_type) pair was notified within
    /// `window` of `now` and should therefore be suppressed; otherwise
    /// records `now` and returns `false`.
    pub fn should_suppress(&mut self, alarm_id: &str, event_type: AlarmEventType, now: DateTime<Utc>, window: Duration) -> bool {
        let key = (alarm_id.to_string(), event_type);
        if let Some(last) = self.last_sent.get(&key) {
            if now - *last < window {
                return true;
            }
        }
        self.last_sent.insert(key, now);
        false
    }
}

/// Suppresses byte-identical notification bodies within a dedupe window,
/// independent of the cooldown tracker above (spec.md §4.8 step 6).
#[derive(Debug, Default)]
pub struct DedupeTracker {
    last_seen: HashMap<String, DateTime<Utc>>,
}

impl DedupeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_suppress(&mut self, body: &str, now: DateTime<Utc>, window: Duration) -> bool {
        if let Some(last) = self.last_seen.get(body) {
            if now - *last < window {
                return true;
            }
        }
        self.last_seen.insert(body.to_string(), now);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::OriginatorType;
    use crate::rule::Severity;
    use chrono::TimeZone;

    fn alarm(severity: Severity, status: AlarmStatus, start_at: DateTime<Utc>) -> Alarm {
        Alarm {
            id: "a1".into(),
            tenant_id: "t1".into(),
            rule_id: "r1".into(),
            originator_type: OriginatorType::Station,
            originator_id: "s1".into(),
            severity,
            status,
            start_at,
            end_at: None,
            last_value: 120.0,
            acked_at: None,
            cleared_at: None,
        }
    }

    #[test]
    fn low_severity_never_escalates() {
        let start = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let a = alarm(Severity::Low, AlarmStatus::Active, start);
        assert!(!should_escalate(&a, start + Duration::hours(1), Duration::minutes(5)));
    }

    #[test]
    fn high_severity_escalates_after_delay() {
        let start = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let a = alarm(Severity::High, AlarmStatus::Active, start);
        assert!(!should_escalate(&a, start + Duration::minutes(1), Duration::minutes(5)));
        assert!(should_escalate(&a, start + Duration::minutes(6), Duration::minutes(5)));
    }

    #[test]
    fn cooldown_suppresses_repeat_within_window() {
        let mut tracker = CooldownTracker::new();
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        assert!(!tracker.should_suppress("a1", AlarmEventType::Escalated, now, Duration::minutes(10)));
        assert!(tracker.should_suppress("a1", AlarmEventType::Escalated, now + Duration::minutes(5), Duration::minutes(10)));
        assert!(!tracker.should_suppress("a1", AlarmEventType::Escalated, now + Duration::minutes(11), Duration::minutes(10)));
    }
}
