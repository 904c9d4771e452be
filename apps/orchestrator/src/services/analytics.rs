// [apps/orchestrator/src/services/analytics.rs]
//! C2/C6: window closure (externally triggered) and the hour -> day ->
//! month -> year rollup chain it sets in motion (event-triggered).
//!
//! Grounded on `gridforge_domain_analytics::aggregate` for the upsert and
//! completeness rules and on `services/ingest.rs` for the
//! write-then-publish transaction shape.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use gridforge_domain_analytics::{apply_hour_fact, build_hour_aggregate, compute_fact, rollup_children, HourUpsertOutcome, StatisticAggregate, StatisticFact};
use gridforge_domain_events::payload::{StatisticCalculated, TelemetryWindowClosed};
use gridforge_domain_events::{DomainEvent, EventEnvelope, Granularity};
use gridforge_infra_db::repositories::{analytics, outbox, telemetry};
use tracing::instrument;

use crate::errors::OrchestratorError;
use crate::state::AppState;

/// Period one level up the hierarchy that `period_start` falls in, and the
/// expected count of that parent's children (spec.md §4.6: 24 hours/day,
/// the month's day count, 12 months/year).
fn parent_window(granularity: Granularity, period_start: DateTime<Utc>) -> Option<(Granularity, DateTime<Utc>, DateTime<Utc>, usize)> {
    let parent = granularity.parent()?;
    let (parent_start, parent_end, expected) = match parent {
        Granularity::Day => {
            let start = Utc.with_ymd_and_hms(period_start.year(), period_start.month(), period_start.day(), 0, 0, 0).unwrap();
            (start, start + chrono::Duration::days(1), 24)
        }
        Granularity::Month => {
            let start = Utc.with_ymd_and_hms(period_start.year(), period_start.month(), 1, 0, 0, 0).unwrap();
            let next_month_start = if period_start.month() == 12 {
                Utc.with_ymd_and_hms(period_start.year() + 1, 1, 1, 0, 0, 0).unwrap()
            } else {
                Utc.with_ymd_and_hms(period_start.year(), period_start.month() + 1, 1, 0, 0, 0).unwrap()
            };
            let days_in_month = (next_month_start - start).num_days() as usize;
            (start, next_month_start, days_in_month)
        }
        Granularity::Year => {
            let start = Utc.with_ymd_and_hms(period_start.year(), 1, 1, 0, 0, 0).unwrap();
            (start, Utc.with_ymd_and_hms(period_start.year() + 1, 1, 1, 0, 0, 0).unwrap(), 12)
        }
        Granularity::Hour => unreachable!("Hour has no children to roll up from"),
    };
    Some((parent, parent_start, parent_end, expected))
}

pub struct AnalyticsService;

impl AnalyticsService {
    /// Externally-triggered window closure: publishes `TelemetryWindowClosed`
    /// for a station's completed hour (or a backfilled one, via
    /// `recalculate`). This is the operation an ingestion gateway or a cron
    /// would call; there is no HTTP surface in this build (SPEC_FULL.md §6).
    #[instrument(skip(state))]
    pub async fn close_window(
        state: &AppState,
        tenant_id: &str,
        station_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        recalculate: bool,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        let envelope = EventEnvelope::new(
            DomainEvent::TelemetryWindowClosed(TelemetryWindowClosed {
                tenant_id: tenant_id.to_string(),
                station_id: station_id.to_string(),
                window_start,
                window_end,
                recalculate,
                occurred_at: now,
            }),
            None,
            now,
        );
        let raw = envelope.to_raw()?;
        let conn = state.db.connection()?;
        outbox::insert(&conn, &raw, now).await?;
        Ok(())
    }

    /// `analytics_hour` consumer: sums a station's mapped measurements over
    /// the closed window into an Hour `StatisticAggregate` and, unless this
    /// is a no-op recalculate, publishes `StatisticCalculated(HOUR)`.
    pub async fn on_window_closed(state: &AppState, envelope: &EventEnvelope) -> Result<(), OrchestratorError> {
        let DomainEvent::TelemetryWindowClosed(event) = &envelope.payload else {
            return Ok(());
        };
        let now = state.now();
        let conn = state.db.connection()?;

        let mappings = state.mapping_cache.get(&conn, &event.station_id).await?;
        let measurements = telemetry::query_window(&conn, &event.tenant_id, &event.station_id, event.window_start, event.window_end).await?;
        let fact = compute_fact(&measurements, &mappings)?;

        let existing = analytics::load(&conn, &event.station_id, Granularity::Hour, event.window_start).await?;
        let outcome = apply_hour_fact(existing.as_ref(), fact, event.recalculate);

        let fact = match outcome {
            HourUpsertOutcome::SkippedNoOp => return Ok(()),
            HourUpsertOutcome::Created(fact) | HourUpsertOutcome::Recalculated(fact) => fact,
        };
        let aggregate = build_hour_aggregate(&event.station_id, event.window_start, fact, now)?;

        let tx = conn.transaction().await.map_err(gridforge_infra_db::DbError::Query)?;
        analytics::upsert(&tx, &aggregate).await?;
        Self::publish_statistic_calculated(&tx, &event.tenant_id, &aggregate, event.recalculate, now).await?;
        tx.commit().await.map_err(gridforge_infra_db::DbError::Query)?;
        Ok(())
    }

    /// `analytics_rollup` consumer: folds a completed child aggregate into
    /// its parent period and, once the parent itself is complete, keeps the
    /// chain moving up (Hour -> Day -> Month -> Year; Year has no parent).
    pub async fn on_statistic_calculated(state: &AppState, envelope: &EventEnvelope) -> Result<(), OrchestratorError> {
        let DomainEvent::StatisticCalculated(event) = &envelope.payload else {
            return Ok(());
        };
        let Some((parent_granularity, parent_start, parent_end, expected)) = parent_window(event.granularity, event.period_start) else {
            return Ok(());
        };
        let now = state.now();
        let conn = state.db.connection()?;

        let children = analytics::load_children(&conn, &event.station_id, event.granularity, parent_start, parent_end).await?;
        let completed: Vec<&StatisticAggregate> = children.iter().filter(|c| c.is_completed).collect();
        let facts: Vec<StatisticFact> = completed.iter().map(|c| c.fact).collect();
        let present = completed.len();

        let aggregate = rollup_children(&event.station_id, parent_granularity, parent_start, &facts, present, expected, event.recalculate, now)?;

        let tx = conn.transaction().await.map_err(gridforge_infra_db::DbError::Query)?;
        analytics::upsert(&tx, &aggregate).await?;
        if aggregate.is_completed {
            Self::publish_statistic_calculated(&tx, &event.tenant_id, &aggregate, event.recalculate, now).await?;
        }
        tx.commit().await.map_err(gridforge_infra_db::DbError::Query)?;
        Ok(())
    }

    async fn publish_statistic_calculated(conn: &libsql::Connection, tenant_id: &str, aggregate: &StatisticAggregate, recalculate: bool, now: DateTime<Utc>) -> Result<(), OrchestratorError> {
        let statistic_id = gridforge_core_clock::Ids::aggregate_id(&aggregate.subject_id, aggregate.granularity.as_str(), aggregate.period_start);
        let envelope = EventEnvelope::new(
            DomainEvent::StatisticCalculated(StatisticCalculated {
                tenant_id: tenant_id.to_string(),
                station_id: aggregate.subject_id.clone(),
                statistic_id,
                granularity: aggregate.granularity,
                period_start: aggregate.period_start,
                occurred_at: now,
                recalculate,
            }),
            None,
            now,
        );
        let raw = envelope.to_raw()?;
        outbox::insert(conn, &raw, now).await?;
        Ok(())
    }
}
