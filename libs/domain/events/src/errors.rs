// [libs/domain/events/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    /// The registry has no decoder for this `event_type`; the row is routed
    /// to the DLQ, never retried automatically (spec.md §4.1/§7, PermanentError).
    #[error("[EVENTS_UNKNOWN_TYPE]: no decoder registered for event_type '{0}'")]
    UnknownEventType(String),

    /// The payload failed to deserialize into the shape its own `event_type`
    /// claims (PermanentError — malformed payload).
    #[error("[EVENTS_DECODE_FAULT]: failed to decode payload for '{event_type}': {source}")]
    DecodeFailed {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("[EVENTS_ENCODE_FAULT]: failed to encode envelope: {0}")]
    EncodeFailed(#[from] serde_json::Error),
}
