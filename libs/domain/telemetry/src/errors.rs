// [libs/domain/telemetry/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("[TELEMETRY_VALIDATION]: identity field '{0}' must not be empty")]
    EmptyIdentityField(&'static str),

    #[error("[TELEMETRY_VALIDATION]: timestamp must be non-zero")]
    ZeroTimestamp,

    #[error("[TELEMETRY_VALIDATION]: point mapping factor must not be zero ({station_id}/{point_key})")]
    ZeroFactor { station_id: String, point_key: String },
}
