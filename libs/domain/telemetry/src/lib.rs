// [libs/domain/telemetry/src/lib.rs]
//! Telemetry store types (C1) and point-mapping resolution (C2).
//!
//! This crate holds only pure domain logic: the TTL cache and the
//! database-backed lookup live in `gridforge-infra-db`, which depends on
//! this crate for the resolution rule itself.

mod errors;
mod mapping;
mod measurement;

pub use errors::TelemetryError;
pub use mapping::{resolve_mapping, PointMapping, Semantic};
pub use measurement::{Measurement, MeasurementValue, Quality};
