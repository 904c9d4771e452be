// [libs/domain/alarms/src/alarm.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rule::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginatorType {
    Device,
    Station,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmStatus {
    Active,
    Acknowledged,
    Cleared,
}

/// Identity = hash(tenant_id, rule_id, originator_id, start_at) (spec.md §3),
/// built by `gridforge_core_clock::Ids::alarm_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: String,
    pub tenant_id: String,
    pub rule_id: String,
    pub originator_type: OriginatorType,
    pub originator_id: String,
    pub severity: Severity,
    pub status: AlarmStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub last_value: f64,
    pub acked_at: Option<DateTime<Utc>>,
    pub cleared_at: Option<DateTime<Utc>>,
}

/// Exists only while a rule is above threshold but has not yet satisfied
/// `duration_seconds` (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleState {
    pub tenant_id: String,
    pub rule_id: String,
    pub originator_type: OriginatorType,
    pub originator_id: String,
    pub pending_since: DateTime<Utc>,
    pub last_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmEventType {
    Active,
    Acknowledged,
    Cleared,
    Escalated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmEvent {
    pub event_type: AlarmEventType,
    pub alarm: Alarm,
}
