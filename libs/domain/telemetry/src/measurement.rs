// [libs/domain/telemetry/src/measurement.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::TelemetryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    Good,
    Uncertain,
    Bad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeasurementValue {
    Numeric(f64),
    Text(String),
}

impl MeasurementValue {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            MeasurementValue::Numeric(v) => Some(*v),
            MeasurementValue::Text(_) => None,
        }
    }
}

/// (tenant_id, station_id, device_id, point_key, ts) -> value/quality.
/// Primary key is the full tuple; upsert overwrites value/quality/updated_at
/// (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub tenant_id: String,
    pub station_id: String,
    pub device_id: String,
    pub point_key: String,
    pub ts: DateTime<Utc>,
    pub value: MeasurementValue,
    pub quality: Quality,
}

impl Measurement {
    /// All identity fields non-empty; `ts` non-zero (spec.md §4.4).
    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.tenant_id.is_empty() {
            return Err(TelemetryError::EmptyIdentityField("tenant_id"));
        }
        if self.station_id.is_empty() {
            return Err(TelemetryError::EmptyIdentityField("station_id"));
        }
        if self.device_id.is_empty() {
            return Err(TelemetryError::EmptyIdentityField("device_id"));
        }
        if self.point_key.is_empty() {
            return Err(TelemetryError::EmptyIdentityField("point_key"));
        }
        if self.ts.timestamp() == 0 {
            return Err(TelemetryError::ZeroTimestamp);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Measurement {
        Measurement {
            tenant_id: "t1".into(),
            station_id: "s1".into(),
            device_id: "d1".into(),
            point_key: "p1".into(),
            ts: Utc::now(),
            value: MeasurementValue::Numeric(1.0),
            quality: Quality::Good,
        }
    }

    #[test]
    fn rejects_empty_identity() {
        let mut m = sample();
        m.device_id.clear();
        assert_eq!(m.validate(), Err(TelemetryError::EmptyIdentityField("device_id")));
    }

    #[test]
    fn accepts_well_formed_measurement() {
        assert!(sample().validate().is_ok());
    }
}
