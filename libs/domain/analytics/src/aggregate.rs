// [libs/domain/analytics/src/aggregate.rs]
use chrono::{DateTime, Datelike, Timelike, Utc};
use gridforge_domain_events::Granularity;
use serde::{Deserialize, Serialize};

use crate::errors::AnalyticsError;
use crate::fact::StatisticFact;

/// A rolled-up statistic at one of the four calendar granularities
/// (spec.md §3 `StatisticAggregate`). Identity is (subject_id, granularity,
/// period_start); `subject_id` is the station for this workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticAggregate {
    pub subject_id: String,
    pub granularity: Granularity,
    pub period_start: DateTime<Utc>,
    pub fact: StatisticFact,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl StatisticAggregate {
    /// `period_start` must sit exactly on the granularity's boundary in UTC
    /// (spec.md §3 invariant).
    pub fn is_aligned(granularity: Granularity, period_start: DateTime<Utc>) -> bool {
        match granularity {
            Granularity::Hour => period_start.minute() == 0 && period_start.second() == 0 && period_start.nanosecond() == 0,
            Granularity::Day => {
                period_start.hour() == 0 && period_start.minute() == 0 && period_start.second() == 0
            }
            Granularity::Month => period_start.day() == 1 && period_start.hour() == 0 && period_start.minute() == 0,
            Granularity::Year => {
                period_start.month() == 1 && period_start.day() == 1 && period_start.hour() == 0 && period_start.minute() == 0
            }
        }
    }

    fn validate_fact(fact: &StatisticFact, is_completed: bool) -> Result<(), AnalyticsError> {
        if is_completed && !fact.is_finite_non_negative() {
            return Err(AnalyticsError::InvalidFact);
        }
        Ok(())
    }

    fn new(
        subject_id: &str,
        granularity: Granularity,
        period_start: DateTime<Utc>,
        fact: StatisticFact,
        is_completed: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, AnalyticsError> {
        if !Self::is_aligned(granularity, period_start) {
            return Err(AnalyticsError::MisalignedPeriod {
                granularity,
                period_start,
            });
        }
        Self::validate_fact(&fact, is_completed)?;
        Ok(StatisticAggregate {
            subject_id: subject_id.to_string(),
            granularity,
            period_start,
            fact,
            is_completed,
            completed_at: if is_completed { Some(now) } else { None },
            updated_at: now,
        })
    }
}

/// Result of applying an Hour fact against whatever is already persisted
/// (spec.md §4.6 step 5).
#[derive(Debug, Clone, PartialEq)]
pub enum HourUpsertOutcome {
    Created(StatisticFact),
    SkippedNoOp,
    Recalculated(StatisticFact),
}

/// Applies the Hour upsert rule: create if absent; if present and not
/// `recalculate`, no-op; otherwise overwrite.
pub fn apply_hour_fact(
    existing: Option<&StatisticAggregate>,
    fact: StatisticFact,
    recalculate: bool,
) -> HourUpsertOutcome {
    match existing {
        None => HourUpsertOutcome::Created(fact),
        Some(_) if !recalculate => HourUpsertOutcome::SkippedNoOp,
        Some(_) => HourUpsertOutcome::Recalculated(fact),
    }
}

pub fn build_hour_aggregate(
    station_id: &str,
    period_start: DateTime<Utc>,
    fact: StatisticFact,
    now: DateTime<Utc>,
) -> Result<StatisticAggregate, AnalyticsError> {
    StatisticAggregate::new(station_id, Granularity::Hour, period_start, fact, true, now)
}

/// Sums `present_count` child facts into the parent's fact and decides
/// completeness: equal to `expected_count` or forced by `recalculate`
/// (spec.md §4.6, "Day rollup... Policy").
pub fn rollup_children(
    station_id: &str,
    granularity: Granularity,
    period_start: DateTime<Utc>,
    children_facts: &[StatisticFact],
    present_count: usize,
    expected_count: usize,
    recalculate: bool,
    now: DateTime<Utc>,
) -> Result<StatisticAggregate, AnalyticsError> {
    let fact = StatisticFact::sum(children_facts);
    let is_completed = present_count == expected_count || recalculate;
    StatisticAggregate::new(station_id, granularity, period_start, fact, is_completed, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, h, 0, 0).unwrap()
    }

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap()
    }

    #[test]
    fn hour_must_be_aligned_to_the_hour_boundary() {
        let misaligned = Utc.with_ymd_and_hms(2026, 1, 20, 5, 30, 0).unwrap();
        assert!(!StatisticAggregate::is_aligned(Granularity::Hour, misaligned));
        assert!(StatisticAggregate::is_aligned(Granularity::Hour, hour(5)));
    }

    #[test]
    fn second_upsert_without_recalculate_is_a_no_op() {
        let now = hour(1);
        let existing = build_hour_aggregate("s1", hour(1), StatisticFact::zero(), now).unwrap();
        let outcome = apply_hour_fact(Some(&existing), StatisticFact::zero(), false);
        assert_eq!(outcome, HourUpsertOutcome::SkippedNoOp);
    }

    #[test]
    fn recalculate_overwrites_existing_hour() {
        let now = hour(1);
        let existing = build_hour_aggregate("s1", hour(1), StatisticFact::zero(), now).unwrap();
        let new_fact = StatisticFact {
            charge_kwh: 10.0,
            ..StatisticFact::zero()
        };
        let outcome = apply_hour_fact(Some(&existing), new_fact, true);
        assert_eq!(outcome, HourUpsertOutcome::Recalculated(new_fact));
    }

    #[test]
    fn day_completes_when_all_expected_hours_present() {
        let facts = vec![
            StatisticFact {
                charge_kwh: 1.0,
                discharge_kwh: 2.0,
                earnings: 0.1,
                carbon_reduction: 0.01,
            };
            24
        ];
        let agg = rollup_children("s1", Granularity::Day, day(), &facts, 24, 24, false, day()).unwrap();
        assert!(agg.is_completed);
        assert_eq!(agg.fact.charge_kwh, 24.0);
        assert_eq!(agg.fact.discharge_kwh, 48.0);
    }

    #[test]
    fn day_stays_incomplete_when_hours_are_missing_and_not_forced() {
        let facts = vec![StatisticFact::zero(); 5];
        let agg = rollup_children("s1", Granularity::Day, day(), &facts, 5, 24, false, day()).unwrap();
        assert!(!agg.is_completed);
    }

    #[test]
    fn recalculate_forces_completion_even_with_missing_hours() {
        let facts = vec![StatisticFact::zero(); 5];
        let agg = rollup_children("s1", Granularity::Day, day(), &facts, 5, 24, true, day()).unwrap();
        assert!(agg.is_completed);
    }
}
