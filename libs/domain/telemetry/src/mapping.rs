// [libs/domain/telemetry/src/mapping.rs]
use serde::{Deserialize, Serialize};

use crate::errors::TelemetryError;

/// Closed vocabulary of business meanings a point can carry (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semantic {
    ChargePowerKw,
    DischargePowerKw,
    Earnings,
    CarbonReduction,
    GridExportKw,
    GridImportKw,
    StateOfChargePercent,
}

impl Semantic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semantic::ChargePowerKw => "charge_power_kw",
            Semantic::DischargePowerKw => "discharge_power_kw",
            Semantic::Earnings => "earnings",
            Semantic::CarbonReduction => "carbon_reduction",
            Semantic::GridExportKw => "grid_export_kw",
            Semantic::GridImportKw => "grid_import_kw",
            Semantic::StateOfChargePercent => "state_of_charge_percent",
        }
    }

    pub fn from_str(raw: &str) -> Option<Semantic> {
        match raw {
            "charge_power_kw" => Some(Semantic::ChargePowerKw),
            "discharge_power_kw" => Some(Semantic::DischargePowerKw),
            "earnings" => Some(Semantic::Earnings),
            "carbon_reduction" => Some(Semantic::CarbonReduction),
            "grid_export_kw" => Some(Semantic::GridExportKw),
            "grid_import_kw" => Some(Semantic::GridImportKw),
            "state_of_charge_percent" => Some(Semantic::StateOfChargePercent),
            _ => None,
        }
    }
}

/// (station_id, [device_id?], point_key) -> (semantic, unit, factor).
/// A device-scoped entry shadows a station-scoped entry for the same
/// (station, point) (spec.md §3/§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointMapping {
    pub station_id: String,
    pub device_id: Option<String>,
    pub point_key: String,
    pub semantic: Semantic,
    pub unit: String,
    pub factor: f64,
}

impl PointMapping {
    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.factor == 0.0 {
            return Err(TelemetryError::ZeroFactor {
                station_id: self.station_id.clone(),
                point_key: self.point_key.clone(),
            });
        }
        Ok(())
    }

    pub fn apply(&self, raw_value: f64) -> f64 {
        raw_value * self.factor
    }
}

/// Resolution order: a device-scoped entry matching (station, device, point)
/// first; otherwise a station-scoped entry (station, None, point). If
/// neither exists, callers silently drop the point (spec.md §4.5) — this
/// function simply returns `None` and leaves that choice to the caller.
pub fn resolve_mapping<'a>(
    mappings: &'a [PointMapping],
    station_id: &str,
    device_id: Option<&str>,
    point_key: &str,
) -> Option<&'a PointMapping> {
    if let Some(device_id) = device_id {
        if let Some(found) = mappings.iter().find(|m| {
            m.station_id == station_id && m.device_id.as_deref() == Some(device_id) && m.point_key == point_key
        }) {
            return Some(found);
        }
    }

    mappings
        .iter()
        .find(|m| m.station_id == station_id && m.device_id.is_none() && m.point_key == point_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station_scoped() -> PointMapping {
        PointMapping {
            station_id: "s1".into(),
            device_id: None,
            point_key: "p1".into(),
            semantic: Semantic::ChargePowerKw,
            unit: "kW".into(),
            factor: 1.0,
        }
    }

    fn device_scoped() -> PointMapping {
        PointMapping {
            station_id: "s1".into(),
            device_id: Some("d1".into()),
            point_key: "p1".into(),
            semantic: Semantic::DischargePowerKw,
            unit: "kW".into(),
            factor: 2.0,
        }
    }

    #[test]
    fn device_scoped_shadows_station_scoped() {
        let mappings = vec![station_scoped(), device_scoped()];
        let resolved = resolve_mapping(&mappings, "s1", Some("d1"), "p1").unwrap();
        assert_eq!(resolved.semantic, Semantic::DischargePowerKw);
    }

    #[test]
    fn falls_back_to_station_scoped_for_other_devices() {
        let mappings = vec![station_scoped(), device_scoped()];
        let resolved = resolve_mapping(&mappings, "s1", Some("d2"), "p1").unwrap();
        assert_eq!(resolved.semantic, Semantic::ChargePowerKw);
    }

    #[test]
    fn missing_mapping_resolves_to_none() {
        let mappings = vec![station_scoped()];
        assert!(resolve_mapping(&mappings, "s1", None, "unknown").is_none());
    }

    #[test]
    fn zero_factor_is_rejected() {
        let mut m = station_scoped();
        m.factor = 0.0;
        assert!(m.validate().is_err());
    }
}
