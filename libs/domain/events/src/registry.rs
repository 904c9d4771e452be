// [libs/domain/events/src/registry.rs]
//! Late-bound routing from a persisted `event_type` string to a typed
//! decoder, replacing reflection-based dispatch (spec.md §9): a `HashMap`
//! keyed by the same stable strings `DomainEvent::event_type` returns.

use std::collections::HashMap;

use crate::envelope::{EventEnvelope, RawEnvelope};
use crate::errors::EventError;
use crate::payload::{
    CommandAcked, CommandFailed, CommandIssued, DomainEvent, SettlementCalculated,
    StatisticCalculated, TelemetryReceived, TelemetryWindowClosed,
};

type DecodeFn = fn(serde_json::Value) -> Result<DomainEvent, serde_json::Error>;

/// Maps a stable `event_type` tag to the function that turns its opaque
/// JSON payload back into a [`DomainEvent`]. Unknown tags are rejected at
/// dispatch and routed to the DLQ (spec.md §4.1).
pub struct PayloadRegistry {
    decoders: HashMap<&'static str, DecodeFn>,
}

impl PayloadRegistry {
    /// The canonical registry wired with every event type this workspace
    /// knows how to produce and consume.
    pub fn canonical() -> Self {
        let mut decoders: HashMap<&'static str, DecodeFn> = HashMap::new();
        decoders.insert("TelemetryReceived", |v| {
            serde_json::from_value::<TelemetryReceived>(v).map(DomainEvent::TelemetryReceived)
        });
        decoders.insert("TelemetryWindowClosed", |v| {
            serde_json::from_value::<TelemetryWindowClosed>(v).map(DomainEvent::TelemetryWindowClosed)
        });
        decoders.insert("StatisticCalculated", |v| {
            serde_json::from_value::<StatisticCalculated>(v).map(DomainEvent::StatisticCalculated)
        });
        decoders.insert("SettlementCalculated", |v| {
            serde_json::from_value::<SettlementCalculated>(v).map(DomainEvent::SettlementCalculated)
        });
        decoders.insert("CommandIssued", |v| {
            serde_json::from_value::<CommandIssued>(v).map(DomainEvent::CommandIssued)
        });
        decoders.insert("CommandAcked", |v| {
            serde_json::from_value::<CommandAcked>(v).map(DomainEvent::CommandAcked)
        });
        decoders.insert("CommandFailed", |v| {
            serde_json::from_value::<CommandFailed>(v).map(DomainEvent::CommandFailed)
        });
        Self { decoders }
    }

    pub fn decode(&self, raw: &RawEnvelope) -> Result<EventEnvelope, EventError> {
        let decoder = self
            .decoders
            .get(raw.event_type.as_str())
            .ok_or_else(|| EventError::UnknownEventType(raw.event_type.clone()))?;

        let payload = decoder(raw.payload.clone()).map_err(|source| EventError::DecodeFailed {
            event_type: raw.event_type.clone(),
            source,
        })?;

        Ok(EventEnvelope {
            event_id: raw.event_id,
            occurred_at: raw.occurred_at,
            correlation_id: raw.correlation_id,
            tenant_id: raw.tenant_id.clone(),
            station_id: raw.station_id.clone(),
            schema_version: raw.schema_version,
            payload,
        })
    }

    pub fn is_known(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }
}

impl Default for PayloadRegistry {
    fn default() -> Self {
        Self::canonical()
    }
}
