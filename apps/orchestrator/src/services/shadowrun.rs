// [apps/orchestrator/src/services/shadowrun.rs]
//! C11: the monthly shadow-reconciliation job. Grounded on
//! `gridforge_domain_shadowrun` for the job/diff/report lifecycle and on
//! `services/settlement.rs` for computing a day's energy/amount from its
//! hour aggregates and tariff plan.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use gridforge_domain_settlement::compute_day_totals;
use gridforge_domain_shadowrun::{compute_day_diff, recommend, summarize, DayDiff, ShadowAlert, ShadowJob, ShadowThresholds};
use gridforge_infra_db::repositories::{analytics, settlement, shadowrun};
use tokio::time::interval;
use tracing::{error, instrument, warn};

use crate::errors::OrchestratorError;
use crate::state::AppState;

pub struct ShadowRunService;

impl ShadowRunService {
    /// Runs one shadow-reconciliation job for a station's statement month
    /// (spec.md §4.11): recomputes every day's energy/amount independently
    /// from its hour aggregates and diffs it against the recorded
    /// `DaySettlement`, then reports and, on a threshold breach, alerts.
    #[instrument(skip(state))]
    pub async fn run(state: &AppState, tenant_id: &str, station_id: &str, statement_month: DateTime<Utc>, job_date: NaiveDate) -> Result<(), OrchestratorError> {
        let conn = state.db.connection()?;
        let existing = shadowrun::find_job(&conn, tenant_id, station_id, statement_month, job_date).await?;
        let job = ShadowJob::new(tenant_id, station_id, statement_month, job_date);
        let job = match existing {
            Some(existing) => existing.start()?,
            None => job.start()?,
        };
        shadowrun::insert_job(&conn, &job).await?;

        match Self::reconcile_month(&conn, tenant_id, station_id, statement_month).await {
            Ok(diffs) => {
                let now = state.now();
                let summary = summarize(&diffs);
                let thresholds = ShadowThresholds::default();
                let action = recommend(&summary, &thresholds);
                let archive_path = format!("shadowruns/{tenant_id}/{station_id}/{}.json", statement_month.format("%Y-%m"));
                let report = gridforge_domain_shadowrun::ShadowReport::from_summary(tenant_id, station_id, statement_month, summary, action, &archive_path);
                shadowrun::insert_report(&conn, &report, now).await?;

                if report.breached() {
                    let alert = ShadowAlert {
                        tenant_id: tenant_id.to_string(),
                        station_id: station_id.to_string(),
                        month: statement_month,
                        recommended_action: action,
                        raised_at: now,
                    };
                    shadowrun::insert_alert(&conn, &alert).await?;
                    warn!(%tenant_id, %station_id, ?action, "shadow run reconciliation breached its thresholds");
                    if let Err(error) = state.shadowrun_notifier.notify(&alert).await {
                        warn!(%error, %tenant_id, %station_id, "shadow run webhook delivery failed");
                    }
                }

                shadowrun::insert_job(&conn, &job.succeed()).await?;
                Ok(())
            }
            Err(error) => {
                shadowrun::insert_job(&conn, &job.fail(&error.to_string())).await?;
                Err(error)
            }
        }
    }

    async fn reconcile_month(conn: &libsql::Connection, tenant_id: &str, station_id: &str, statement_month: DateTime<Utc>) -> Result<Vec<DayDiff>, OrchestratorError> {
        let month_end = if statement_month.month() == 12 {
            Utc.with_ymd_and_hms(statement_month.year() + 1, 1, 1, 0, 0, 0).unwrap()
        } else {
            Utc.with_ymd_and_hms(statement_month.year(), statement_month.month() + 1, 1, 0, 0, 0).unwrap()
        };
        let tariff = settlement::load_tariff_plan(conn, tenant_id, station_id, statement_month).await?;

        let mut diffs = Vec::new();
        let mut day_start = statement_month;
        while day_start < month_end {
            let day_end = day_start + Duration::days(1);
            let hour_aggregates = analytics::load_children(conn, station_id, gridforge_domain_events::Granularity::Hour, day_start, day_end).await?;
            let hour_facts: Vec<_> = hour_aggregates.iter().filter(|a| a.is_completed).map(|a| (a.period_start, a.fact)).collect();
            let present_hours = hour_facts.len() as u32;

            let (recomputed_energy, recomputed_amount) = compute_day_totals(station_id, day_start, &hour_facts, 24, &tariff, true)?;
            let recorded = settlement::load_day_settlement(conn, tenant_id, station_id, day_start).await?;
            let (settlement_energy, settlement_amount) = recorded.map(|s| (s.energy_kwh, s.amount)).unwrap_or((0.0, 0.0));

            diffs.push(compute_day_diff(day_start.date_naive(), recomputed_energy, settlement_energy, recomputed_amount, settlement_amount, 24, present_hours));
            day_start = day_end;
        }
        Ok(diffs)
    }
}

/// Daily daemon wrapper: enqueues and runs the shadow job for every
/// tenant/station with a tariff plan configured for the current statement
/// month (spec.md §4.11 step 1), month-to-date. A job failure for one
/// station is logged and does not stop the sweep from reaching the rest.
pub fn spawn_shadowrun_loop(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(state.config.shadowrun_poll_interval);
        loop {
            ticker.tick().await;
            if let Err(error) = run_scheduled_sweep(&state).await {
                error!(%error, "shadow run sweep failed");
            }
        }
    })
}

async fn run_scheduled_sweep(state: &AppState) -> Result<(), OrchestratorError> {
    let now = state.now();
    let statement_month = Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0).unwrap();
    let job_date = now.date_naive();

    let conn = state.db.connection()?;
    let scopes = settlement::list_tariff_scopes_for_month(&conn, statement_month).await?;

    for (tenant_id, station_id) in scopes {
        if let Err(error) = ShadowRunService::run(state, &tenant_id, &station_id, statement_month, job_date).await {
            error!(%error, %tenant_id, %station_id, "shadow run job failed during scheduled sweep");
        }
    }
    Ok(())
}
