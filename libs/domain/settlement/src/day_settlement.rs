// [libs/domain/settlement/src/day_settlement.rs]
use chrono::{DateTime, Timelike, Utc};
use gridforge_domain_analytics::StatisticFact;
use serde::{Deserialize, Serialize};

use crate::errors::SettlementError;
use crate::tariff::TariffPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStatus {
    Draft,
    Calculated,
}

/// Identity = (tenant_id, station_id, day_start) (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySettlement {
    pub tenant_id: String,
    pub station_id: String,
    pub day_start: DateTime<Utc>,
    pub energy_kwh: f64,
    pub amount: f64,
    pub currency: String,
    pub status: SettlementStatus,
    pub version: u32,
}

/// `energy = Σ(charge_kwh + discharge_kwh)`, `amount = Σ hour_energy ×
/// price_at(hour)` (spec.md §4.7 steps 2-4). `hour_facts` holds only the
/// hours actually present for the day; fewer than `expected_hours` without
/// `recalculate` aborts with `IncompleteHours`.
pub fn compute_day_totals(
    station_id: &str,
    day_start: DateTime<Utc>,
    hour_facts: &[(DateTime<Utc>, StatisticFact)],
    expected_hours: usize,
    tariff: &TariffPlan,
    recalculate: bool,
) -> Result<(f64, f64), SettlementError> {
    if hour_facts.len() < expected_hours && !recalculate {
        return Err(SettlementError::IncompleteHours {
            station_id: station_id.to_string(),
            day_start,
        });
    }

    let mut energy_kwh = 0.0;
    let mut amount = 0.0;
    for (hour_start, fact) in hour_facts {
        let hour_energy = fact.charge_kwh + fact.discharge_kwh;
        let minute_of_day = hour_start.hour() * 60 + hour_start.minute();
        let price = tariff.price_at(minute_of_day)?;
        energy_kwh += hour_energy;
        amount += hour_energy * price;
    }
    Ok((energy_kwh, amount))
}

/// Outcome of upserting a `DaySettlement`: whether `SettlementCalculated`
/// should be emitted. A first insert always emits; an overwrite only emits
/// when `emit_on_recalculate` is configured, to avoid duplicate downstream
/// recomputes (spec.md §4.7 step 5; resolved as an Open Question, see
/// DESIGN.md).
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementUpsertOutcome {
    pub settlement: DaySettlement,
    pub should_emit: bool,
}

pub fn upsert_day_settlement(
    existing: Option<&DaySettlement>,
    tenant_id: &str,
    station_id: &str,
    day_start: DateTime<Utc>,
    energy_kwh: f64,
    amount: f64,
    currency: &str,
    emit_on_recalculate: bool,
) -> SettlementUpsertOutcome {
    match existing {
        None => SettlementUpsertOutcome {
            settlement: DaySettlement {
                tenant_id: tenant_id.to_string(),
                station_id: station_id.to_string(),
                day_start,
                energy_kwh,
                amount,
                currency: currency.to_string(),
                status: SettlementStatus::Calculated,
                version: 1,
            },
            should_emit: true,
        },
        Some(prior) => SettlementUpsertOutcome {
            settlement: DaySettlement {
                energy_kwh,
                amount,
                status: SettlementStatus::Calculated,
                version: prior.version + 1,
                ..prior.clone()
            },
            should_emit: emit_on_recalculate,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::TariffRule;
    use chrono::TimeZone;

    fn flat_plan() -> TariffPlan {
        TariffPlan {
            currency: "CNY".into(),
            rules: vec![TariffRule {
                start_minute: 0,
                end_minute: 1440,
                price_per_kwh: 1.0,
            }],
            fallback_price: None,
        }
    }

    #[test]
    fn hour_roll_up_scenario_s1() {
        let day_start = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let fact = StatisticFact {
            charge_kwh: 1.0,
            discharge_kwh: 2.0,
            earnings: 0.1,
            carbon_reduction: 0.01,
        };
        let hour_facts: Vec<_> = (0..24)
            .map(|h| (Utc.with_ymd_and_hms(2026, 1, 20, h, 0, 0).unwrap(), fact))
            .collect();
        let (energy, amount) = compute_day_totals("s1", day_start, &hour_facts, 24, &flat_plan(), false).unwrap();
        assert_eq!(energy, 72.0);
        assert_eq!(amount, 72.0);
    }

    #[test]
    fn backfill_scenario_s2_bumps_version_without_reemitting_by_default() {
        let existing = DaySettlement {
            tenant_id: "t1".into(),
            station_id: "s1".into(),
            day_start: Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap(),
            energy_kwh: 72.0,
            amount: 72.0,
            currency: "CNY".into(),
            status: SettlementStatus::Calculated,
            version: 1,
        };
        let outcome = upsert_day_settlement(Some(&existing), "t1", "s1", existing.day_start, 99.0, 99.0, "CNY", false);
        assert_eq!(outcome.settlement.version, 2);
        assert_eq!(outcome.settlement.energy_kwh, 99.0);
        assert!(!outcome.should_emit);
    }

    #[test]
    fn incomplete_hours_without_recalculate_aborts() {
        let day_start = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let err = compute_day_totals("s1", day_start, &[], 24, &flat_plan(), false).unwrap_err();
        assert!(matches!(err, SettlementError::IncompleteHours { .. }));
    }
}
