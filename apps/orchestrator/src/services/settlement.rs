// [apps/orchestrator/src/services/settlement.rs]
//! C7/C8: folding a completed Day aggregate into a `DaySettlement`, and the
//! monthly statement lifecycle (generate/freeze/void) an operator drives
//! directly rather than through an event.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use gridforge_domain_events::{DomainEvent, EventEnvelope, Granularity};
use gridforge_domain_events::payload::SettlementCalculated;
use gridforge_domain_settlement::{
    compute_day_totals, freeze_statement, generate_statement, upsert_day_settlement, void_statement, SettlementError,
};
use gridforge_infra_db::repositories::{analytics, outbox, settlement};
use tracing::{info, instrument};

use crate::errors::OrchestratorError;
use crate::state::AppState;

pub struct SettlementService;

impl SettlementService {
    /// `settlement_day` consumer: only acts on a completed Day aggregate.
    /// `SettlementError::IncompleteHours` is an expected transient state
    /// while hours keep trickling in, not a dispatch failure — spec.md §7
    /// says to wait for more hours rather than dead-letter the row.
    pub async fn on_statistic_calculated(state: &AppState, envelope: &EventEnvelope) -> Result<(), OrchestratorError> {
        let DomainEvent::StatisticCalculated(event) = &envelope.payload else {
            return Ok(());
        };
        if event.granularity != Granularity::Day {
            return Ok(());
        }

        let now = state.now();
        let conn = state.db.connection()?;
        let day_start = event.period_start;
        let day_end = day_start + chrono::Duration::days(1);

        let hour_aggregates = analytics::load_children(&conn, &event.station_id, Granularity::Hour, day_start, day_end).await?;
        let hour_facts: Vec<(DateTime<Utc>, gridforge_domain_analytics::StatisticFact)> = hour_aggregates
            .iter()
            .filter(|a| a.is_completed)
            .map(|a| (a.period_start, a.fact))
            .collect();

        let month_start = Utc.with_ymd_and_hms(day_start.year(), day_start.month(), 1, 0, 0, 0).unwrap();
        let tariff = settlement::load_tariff_plan(&conn, &event.tenant_id, &event.station_id, month_start).await?;

        let totals = compute_day_totals(&event.station_id, day_start, &hour_facts, 24, &tariff, event.recalculate);
        let (energy_kwh, amount) = match totals {
            Ok(totals) => totals,
            Err(SettlementError::IncompleteHours { .. }) => {
                info!(station_id = %event.station_id, %day_start, "day settlement waiting on more hours");
                return Ok(());
            }
            Err(other) => return Err(other.into()),
        };

        let existing = settlement::load_day_settlement(&conn, &event.tenant_id, &event.station_id, day_start).await?;
        let outcome = upsert_day_settlement(
            existing.as_ref(),
            &event.tenant_id,
            &event.station_id,
            day_start,
            energy_kwh,
            amount,
            &tariff.currency,
            state.config.emit_on_settlement_recalculate,
        );

        let tx = conn.transaction().await.map_err(gridforge_infra_db::DbError::Query)?;
        settlement::upsert_day_settlement(&tx, &outcome.settlement).await?;
        if outcome.should_emit {
            let settlement_envelope = EventEnvelope::new(
                DomainEvent::SettlementCalculated(SettlementCalculated {
                    tenant_id: event.tenant_id.clone(),
                    subject_id: event.station_id.clone(),
                    day_start,
                    amount,
                    occurred_at: now,
                }),
                None,
                now,
            );
            outbox::insert(&tx, &settlement_envelope.to_raw()?, now).await?;
        }
        tx.commit().await.map_err(gridforge_infra_db::DbError::Query)?;
        Ok(())
    }

    /// Generates a new draft statement over a month's day settlements
    /// (spec.md §4.7 "generate"). `regenerate` allows a new version when an
    /// active one already exists.
    #[instrument(skip(state))]
    pub async fn generate_statement(
        state: &AppState,
        tenant_id: &str,
        station_id: &str,
        statement_month: DateTime<Utc>,
        category: &str,
        regenerate: bool,
    ) -> Result<(), OrchestratorError> {
        let conn = state.db.connection()?;
        let month_end = if statement_month.month() == 12 {
            Utc.with_ymd_and_hms(statement_month.year() + 1, 1, 1, 0, 0, 0).unwrap()
        } else {
            Utc.with_ymd_and_hms(statement_month.year(), statement_month.month() + 1, 1, 0, 0, 0).unwrap()
        };

        let existing = settlement::load_active_statement(&conn, tenant_id, station_id, statement_month, category).await?;
        let day_settlements = settlement::load_day_settlements_for_month(&conn, tenant_id, station_id, statement_month, month_end).await?;
        let (stmt, items) = generate_statement(existing.as_ref(), tenant_id, station_id, statement_month, category, &day_settlements, regenerate)?;

        settlement::insert_statement(&conn, &stmt, &items).await?;
        Ok(())
    }

    /// Freezes the current draft statement, stamping an immutable snapshot
    /// hash over its line items (spec.md §4.7 "freeze").
    pub async fn freeze(state: &AppState, tenant_id: &str, station_id: &str, statement_month: DateTime<Utc>, category: &str, version: u32) -> Result<(), OrchestratorError> {
        let now = state.now();
        let conn = state.db.connection()?;
        let Some(stmt) = settlement::load_active_statement(&conn, tenant_id, station_id, statement_month, category).await? else {
            return Err(gridforge_infra_db::DbError::NotFound.into());
        };
        let items = settlement::load_statement_items(&conn, tenant_id, station_id, statement_month, category, version).await?;
        let frozen = freeze_statement(&stmt, &items, now)?;
        settlement::update_statement_status(&conn, &frozen).await?;
        Ok(())
    }

    /// Voids a draft or frozen statement (correction/cancellation path).
    pub async fn void(state: &AppState, tenant_id: &str, station_id: &str, statement_month: DateTime<Utc>, category: &str, reason: &str) -> Result<(), OrchestratorError> {
        let conn = state.db.connection()?;
        let Some(stmt) = settlement::load_active_statement(&conn, tenant_id, station_id, statement_month, category).await? else {
            return Err(gridforge_infra_db::DbError::NotFound.into());
        };
        let voided = void_statement(&stmt, reason)?;
        settlement::update_statement_status(&conn, &voided).await?;
        Ok(())
    }
}
