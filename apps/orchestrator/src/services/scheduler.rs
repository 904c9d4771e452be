// [apps/orchestrator/src/services/scheduler.rs]
//! C10: the minute-tick strategy evaluator daemon. Grounded on
//! `gridforge_domain_scheduler::tick` for the decision itself and on
//! `services/commands.rs::issue` for turning a `ScheduledCommand` into an
//! actual dispatched command.

use gridforge_domain_scheduler::evaluate_tick;
use gridforge_domain_telemetry::{MeasurementValue, Semantic};
use gridforge_infra_db::repositories::{scheduler, telemetry};
use tokio::time::interval;
use tracing::{error, instrument, warn};

use crate::errors::OrchestratorError;
use crate::services::commands::CommandService;
use crate::state::AppState;

pub struct SchedulerService;

impl SchedulerService {
    /// One minute tick over every enabled AUTO-mode strategy
    /// (spec.md §4.10): resolve the template's required semantic to its
    /// freshest mapped sample, evaluate, and issue the resulting command
    /// through the same idempotent path a manual operator call would use.
    #[instrument(skip(state))]
    pub async fn tick(state: &AppState) -> Result<usize, OrchestratorError> {
        let now = state.now();
        let conn = state.db.connection()?;
        let strategies = scheduler::load_enabled_auto_strategies(&conn).await?;
        let mut issued = 0;

        for strategy in &strategies {
            let mappings = state.mapping_cache.get(&conn, &strategy.station_id).await?;
            let Some(point_key) = mappings.iter().find(|m| m.semantic == Semantic::GridExportKw).map(|m| m.point_key.clone()) else {
                continue;
            };
            let sample = telemetry::query_latest(&conn, &strategy.tenant_id, &strategy.station_id, &point_key).await?;
            let latest_grid_export_kw = match sample.map(|m| m.value) {
                Some(MeasurementValue::Numeric(v)) => Some(v),
                _ => None,
            };

            let Some(scheduled) = evaluate_tick(strategy, now, latest_grid_export_kw) else {
                continue;
            };
            if let Err(error) = CommandService::issue(
                state,
                &strategy.tenant_id,
                &scheduled.station_id,
                &scheduled.station_id,
                &scheduled.command_type,
                scheduled.payload,
                Some(&scheduled.idempotency_key),
                now,
            )
            .await
            {
                warn!(%error, station_id = %strategy.station_id, "scheduler tick failed to issue command");
                continue;
            }
            issued += 1;
        }
        Ok(issued)
    }
}

/// Daemon wrapper around `SchedulerService::tick`, on `config.scheduler_tick_interval`.
pub fn spawn_scheduler_loop(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(state.config.scheduler_tick_interval);
        loop {
            ticker.tick().await;
            if let Err(error) = SchedulerService::tick(&state).await {
                error!(%error, "scheduler tick failed");
            }
        }
    })
}
