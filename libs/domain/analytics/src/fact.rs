// [libs/domain/analytics/src/fact.rs]
use gridforge_domain_telemetry::{resolve_mapping, Measurement, PointMapping, Semantic};
use serde::{Deserialize, Serialize};

use crate::errors::AnalyticsError;

/// The sum calculator's output: the fact is a total over the window, not an
/// integral (spec.md §4.6 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticFact {
    pub charge_kwh: f64,
    pub discharge_kwh: f64,
    pub earnings: f64,
    pub carbon_reduction: f64,
}

impl StatisticFact {
    pub fn zero() -> Self {
        StatisticFact {
            charge_kwh: 0.0,
            discharge_kwh: 0.0,
            earnings: 0.0,
            carbon_reduction: 0.0,
        }
    }

    pub fn add(&self, other: &StatisticFact) -> StatisticFact {
        StatisticFact {
            charge_kwh: self.charge_kwh + other.charge_kwh,
            discharge_kwh: self.discharge_kwh + other.discharge_kwh,
            earnings: self.earnings + other.earnings,
            carbon_reduction: self.carbon_reduction + other.carbon_reduction,
        }
    }

    pub fn sum<'a>(facts: impl IntoIterator<Item = &'a StatisticFact>) -> StatisticFact {
        facts.into_iter().fold(StatisticFact::zero(), |acc, f| acc.add(f))
    }

    pub fn is_finite_non_negative(&self) -> bool {
        [self.charge_kwh, self.discharge_kwh, self.earnings, self.carbon_reduction]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Groups measurements by resolved semantic, multiplies by the mapping's
/// factor, and sums per-semantic (spec.md §4.6 steps 2-4). Measurements whose
/// point has no mapping are silently dropped, matching C2's resolution rule.
/// Only `ChargePowerKw`, `DischargePowerKw`, `Earnings` and `CarbonReduction`
/// feed a `StatisticFact`; other semantics (grid export/import, state of
/// charge) are consumed elsewhere (the alarm evaluator) and ignored here.
pub fn compute_fact(measurements: &[Measurement], mappings: &[PointMapping]) -> Result<StatisticFact, AnalyticsError> {
    if mappings.is_empty() {
        let station_id = measurements
            .first()
            .map(|m| m.station_id.clone())
            .unwrap_or_default();
        return Err(AnalyticsError::NoMappings { station_id });
    }

    let mut fact = StatisticFact::zero();
    for measurement in measurements {
        let Some(mapping) = resolve_mapping(
            mappings,
            &measurement.station_id,
            Some(measurement.device_id.as_str()),
            &measurement.point_key,
        ) else {
            continue;
        };
        let Some(raw) = measurement.value.as_numeric() else {
            continue;
        };
        let scaled = mapping.apply(raw);
        match mapping.semantic {
            Semantic::ChargePowerKw => fact.charge_kwh += scaled,
            Semantic::DischargePowerKw => fact.discharge_kwh += scaled,
            Semantic::Earnings => fact.earnings += scaled,
            Semantic::CarbonReduction => fact.carbon_reduction += scaled,
            _ => {}
        }
    }
    Ok(fact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gridforge_domain_telemetry::{MeasurementValue, Quality};

    fn measurement(point_key: &str, value: f64) -> Measurement {
        Measurement {
            tenant_id: "t1".into(),
            station_id: "s1".into(),
            device_id: "d1".into(),
            point_key: point_key.into(),
            ts: Utc::now(),
            value: MeasurementValue::Numeric(value),
            quality: Quality::Good,
        }
    }

    fn mapping(point_key: &str, semantic: Semantic, factor: f64) -> PointMapping {
        PointMapping {
            station_id: "s1".into(),
            device_id: None,
            point_key: point_key.into(),
            semantic,
            unit: "kW".into(),
            factor,
        }
    }

    #[test]
    fn sums_per_semantic_scaled_by_factor() {
        let measurements = vec![measurement("charge", 1.0), measurement("charge", 1.0), measurement("discharge", 2.0)];
        let mappings = vec![
            mapping("charge", Semantic::ChargePowerKw, 1.0),
            mapping("discharge", Semantic::DischargePowerKw, 1.0),
        ];
        let fact = compute_fact(&measurements, &mappings).unwrap();
        assert_eq!(fact.charge_kwh, 2.0);
        assert_eq!(fact.discharge_kwh, 2.0);
    }

    #[test]
    fn unmapped_points_are_dropped_silently() {
        let measurements = vec![measurement("unknown", 5.0)];
        let mappings = vec![mapping("charge", Semantic::ChargePowerKw, 1.0)];
        let fact = compute_fact(&measurements, &mappings).unwrap();
        assert_eq!(fact, StatisticFact::zero());
    }

    #[test]
    fn no_mappings_at_all_is_a_domain_error() {
        let measurements = vec![measurement("charge", 1.0)];
        assert!(compute_fact(&measurements, &[]).is_err());
    }
}
