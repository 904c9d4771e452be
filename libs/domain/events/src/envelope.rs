// [libs/domain/events/src/envelope.rs]
//! The envelope every payload travels in (spec.md §4.1), and the
//! wire-level twin that is actually what gets persisted into the outbox:
//! a raw `event_type` string plus an untyped JSON payload, so the registry
//! has real decoding work to do instead of leaning on a derive macro to
//! pick the right Rust type for us.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EventError;
use crate::payload::DomainEvent;

/// In-process envelope: payload is already a concrete [`DomainEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub tenant_id: String,
    pub station_id: Option<String>,
    pub schema_version: u32,
    pub payload: DomainEvent,
}

impl EventEnvelope {
    /// Builds a new envelope at emit time. `correlation_id` defaults to the
    /// freshly-minted `event_id` when the caller has no ambient one to
    /// propagate (spec.md §4.1).
    pub fn new(payload: DomainEvent, correlation_id: Option<Uuid>, occurred_at: DateTime<Utc>) -> Self {
        let event_id = Uuid::new_v4();
        Self {
            event_id,
            occurred_at,
            correlation_id: correlation_id.unwrap_or(event_id),
            tenant_id: payload.tenant_id().to_string(),
            station_id: payload.station_id().map(|s| s.to_string()),
            schema_version: 1,
            payload,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }

    /// Lowers this envelope to the wire shape stored in the outbox.
    pub fn to_raw(&self) -> Result<RawEnvelope, EventError> {
        let payload_json = self.payload.to_json()?;
        Ok(RawEnvelope {
            event_id: self.event_id,
            occurred_at: self.occurred_at,
            correlation_id: self.correlation_id,
            tenant_id: self.tenant_id.clone(),
            station_id: self.station_id.clone(),
            schema_version: self.schema_version,
            event_type: self.event_type().to_string(),
            payload: payload_json,
        })
    }
}

/// Wire envelope for outbox rows / DLQ records. `payload` is opaque JSON
/// until a [`crate::registry::PayloadRegistry`] decodes it by `event_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEnvelope {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub tenant_id: String,
    pub station_id: Option<String>,
    pub schema_version: u32,
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl RawEnvelope {
    pub fn to_bytes(&self) -> Result<Vec<u8>, EventError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EventError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
