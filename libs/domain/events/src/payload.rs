// [libs/domain/events/src/payload.rs]
//! The canonical event set (spec.md §4.1). Each variant is a plain struct so
//! it can be serialized independently of the envelope that carries it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calendar granularity a `StatisticAggregate` is rolled up at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    Hour,
    Day,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "HOUR",
            Granularity::Day => "DAY",
            Granularity::Month => "MONTH",
            Granularity::Year => "YEAR",
        }
    }

    /// The granularity one level up the aggregation hierarchy, if any.
    pub fn parent(&self) -> Option<Granularity> {
        match self {
            Granularity::Hour => Some(Granularity::Day),
            Granularity::Day => Some(Granularity::Month),
            Granularity::Month => Some(Granularity::Year),
            Granularity::Year => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSample {
    pub point_key: String,
    pub ts: DateTime<Utc>,
    pub value: PointValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Numeric(f64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReceived {
    pub tenant_id: String,
    pub station_id: String,
    pub device_id: String,
    pub points: Vec<PointSample>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryWindowClosed {
    pub tenant_id: String,
    pub station_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub recalculate: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticCalculated {
    pub tenant_id: String,
    pub station_id: String,
    pub statistic_id: String,
    pub granularity: Granularity,
    pub period_start: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
    pub recalculate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementCalculated {
    pub tenant_id: String,
    pub subject_id: String,
    pub day_start: DateTime<Utc>,
    pub amount: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandIssued {
    pub command_id: String,
    pub tenant_id: String,
    pub station_id: String,
    pub device_id: String,
    pub command_type: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandAcked {
    pub command_id: String,
    pub tenant_id: String,
    pub station_id: String,
    pub device_id: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandFailed {
    pub command_id: String,
    pub tenant_id: String,
    pub station_id: String,
    pub device_id: String,
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}

/// The closed set of payloads that travel through the bus. New event types
/// are added here and wired into the registry in `registry.rs`; nothing
/// downstream ever derives an event's name from a language-level type id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    TelemetryReceived(TelemetryReceived),
    TelemetryWindowClosed(TelemetryWindowClosed),
    StatisticCalculated(StatisticCalculated),
    SettlementCalculated(SettlementCalculated),
    CommandIssued(CommandIssued),
    CommandAcked(CommandAcked),
    CommandFailed(CommandFailed),
}

impl DomainEvent {
    /// Stable string tag used for outbox rows, the registry lookup, and DLQ
    /// records. Never derived from `std::any::type_name`.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::TelemetryReceived(_) => "TelemetryReceived",
            DomainEvent::TelemetryWindowClosed(_) => "TelemetryWindowClosed",
            DomainEvent::StatisticCalculated(_) => "StatisticCalculated",
            DomainEvent::SettlementCalculated(_) => "SettlementCalculated",
            DomainEvent::CommandIssued(_) => "CommandIssued",
            DomainEvent::CommandAcked(_) => "CommandAcked",
            DomainEvent::CommandFailed(_) => "CommandFailed",
        }
    }

    pub fn tenant_id(&self) -> &str {
        match self {
            DomainEvent::TelemetryReceived(e) => &e.tenant_id,
            DomainEvent::TelemetryWindowClosed(e) => &e.tenant_id,
            DomainEvent::StatisticCalculated(e) => &e.tenant_id,
            DomainEvent::SettlementCalculated(e) => &e.tenant_id,
            DomainEvent::CommandIssued(e) => &e.tenant_id,
            DomainEvent::CommandAcked(e) => &e.tenant_id,
            DomainEvent::CommandFailed(e) => &e.tenant_id,
        }
    }

    /// Serializes just the inner payload struct (not the enum wrapper), so
    /// the wire shape is `{"event_type": "...", "payload": {...fields}}`
    /// rather than a nested `{"TelemetryReceived": {...}}` tag.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            DomainEvent::TelemetryReceived(e) => serde_json::to_value(e),
            DomainEvent::TelemetryWindowClosed(e) => serde_json::to_value(e),
            DomainEvent::StatisticCalculated(e) => serde_json::to_value(e),
            DomainEvent::SettlementCalculated(e) => serde_json::to_value(e),
            DomainEvent::CommandIssued(e) => serde_json::to_value(e),
            DomainEvent::CommandAcked(e) => serde_json::to_value(e),
            DomainEvent::CommandFailed(e) => serde_json::to_value(e),
        }
    }

    pub fn station_id(&self) -> Option<&str> {
        match self {
            DomainEvent::TelemetryReceived(e) => Some(&e.station_id),
            DomainEvent::TelemetryWindowClosed(e) => Some(&e.station_id),
            DomainEvent::StatisticCalculated(e) => Some(&e.station_id),
            DomainEvent::SettlementCalculated(e) => None,
            DomainEvent::CommandIssued(e) => Some(&e.station_id),
            DomainEvent::CommandAcked(e) => Some(&e.station_id),
            DomainEvent::CommandFailed(e) => Some(&e.station_id),
        }
    }
}
