// [libs/domain/shadowrun/src/diff.rs]
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Independent recomputation vs. the primary pipeline's recorded settlement,
/// for a single day (spec.md §4.11 steps 2-3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayDiff {
    pub day: NaiveDate,
    pub energy_diff: f64,
    pub amount_diff: f64,
    pub missing_hours: u32,
}

pub fn compute_day_diff(
    day: NaiveDate,
    hour_sum_kwh: f64,
    settlement_energy_kwh: f64,
    recomputed_amount: f64,
    settlement_amount: f64,
    expected_hours: u32,
    present_hours: u32,
) -> DayDiff {
    DayDiff {
        day,
        energy_diff: hour_sum_kwh - settlement_energy_kwh,
        amount_diff: recomputed_amount - settlement_amount,
        missing_hours: expected_hours.saturating_sub(present_hours),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub diff_energy_max: f64,
    pub diff_amount_max: f64,
    pub missing_hours_total: u32,
}

/// Aggregates per-day diffs into the report's headline figures
/// (spec.md §4.11 step 4): the max absolute diff across days, and the total
/// missing-hour count.
pub fn summarize(diffs: &[DayDiff]) -> DiffSummary {
    diffs.iter().fold(DiffSummary::default(), |mut acc, d| {
        acc.diff_energy_max = acc.diff_energy_max.max(d.energy_diff.abs());
        acc.diff_amount_max = acc.diff_amount_max.max(d.amount_diff.abs());
        acc.missing_hours_total += d.missing_hours;
        acc
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedAction {
    ReplayMissingHours,
    CheckMappingOrTariff,
    CheckTariffOrSettlement,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowThresholds {
    pub missing_hours: u32,
    pub energy_abs: f64,
    pub amount_abs: f64,
}

impl Default for ShadowThresholds {
    fn default() -> Self {
        ShadowThresholds {
            missing_hours: 1,
            energy_abs: 1.0,
            amount_abs: 1.0,
        }
    }
}

/// Threshold checks in priority order (spec.md §4.11 step 6).
pub fn recommend(summary: &DiffSummary, thresholds: &ShadowThresholds) -> RecommendedAction {
    if summary.missing_hours_total >= thresholds.missing_hours {
        RecommendedAction::ReplayMissingHours
    } else if summary.diff_energy_max >= thresholds.energy_abs {
        RecommendedAction::CheckMappingOrTariff
    } else if summary.diff_amount_max >= thresholds.amount_abs {
        RecommendedAction::CheckTariffOrSettlement
    } else {
        RecommendedAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn scenario_s6_large_amount_diff_recommends_tariff_check() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let diff = compute_day_diff(day, 72.0, 72.0, 162.0, 72.0, 24, 24);
        let summary = summarize(&[diff]);
        assert!(summary.diff_amount_max >= 90.0);
        let thresholds = ShadowThresholds {
            missing_hours: 1,
            energy_abs: 1_000.0,
            amount_abs: 5.0,
        };
        assert_eq!(recommend(&summary, &thresholds), RecommendedAction::CheckTariffOrSettlement);
    }

    #[test]
    fn missing_hours_takes_priority_over_amount_diff() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let diff = compute_day_diff(day, 0.0, 0.0, 0.0, 0.0, 24, 10);
        let summary = summarize(&[diff]);
        let thresholds = ShadowThresholds {
            missing_hours: 1,
            energy_abs: 1_000.0,
            amount_abs: 1_000.0,
        };
        assert_eq!(recommend(&summary, &thresholds), RecommendedAction::ReplayMissingHours);
    }

    #[test]
    fn no_breach_recommends_none() {
        let summary = DiffSummary::default();
        assert_eq!(recommend(&summary, &ShadowThresholds::default()), RecommendedAction::None);
    }
}
