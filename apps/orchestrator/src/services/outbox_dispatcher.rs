// [apps/orchestrator/src/services/outbox_dispatcher.rs]
//! C4/C5: the dispatcher loop. Claims a batch, decodes each row, runs
//! every registered consumer for its `event_type` behind the per-consumer
//! idempotency guard, and acks or dead-letters the row.
//!
//! spec.md §9 documents current behavior as "failed once -> DLQ
//! immediately"; this dispatcher does not retry a failed row. `mark_retry`
//! stays in `gridforge-infra-db` as a building block a future bounded-retry
//! policy could use, but nothing here calls it (see DESIGN.md).

use gridforge_domain_events::{EventEnvelope, RawEnvelope};
use gridforge_infra_db::repositories::{outbox, processed_events};
use tokio::time::interval;
use tracing::{error, info, instrument, warn};

use crate::errors::OrchestratorError;
use crate::services::{alarms, analytics, commands, settlement};
use crate::state::AppState;

/// One registered consumer: a name (its idempotency-ledger key) and the
/// handler it runs. Multiple consumers may subscribe to the same
/// `event_type`; each gets its own `processed_events` row.
struct Consumer {
    name: &'static str,
    handler: for<'a> fn(&'a AppState, &'a EventEnvelope) -> futures::future::BoxFuture<'a, Result<(), OrchestratorError>>,
}

fn consumers_for(event_type: &str) -> &'static [Consumer] {
    match event_type {
        "TelemetryReceived" => &[Consumer {
            name: "alarm_evaluator",
            handler: |state, envelope| Box::pin(alarms::AlarmEvaluator::evaluate_sample(state, envelope)),
        }],
        "TelemetryWindowClosed" => &[Consumer {
            name: "analytics_hour",
            handler: |state, envelope| Box::pin(analytics::AnalyticsService::on_window_closed(state, envelope)),
        }],
        "StatisticCalculated" => &[
            Consumer {
                name: "analytics_rollup",
                handler: |state, envelope| Box::pin(analytics::AnalyticsService::on_statistic_calculated(state, envelope)),
            },
            Consumer {
                name: "settlement_day",
                handler: |state, envelope| Box::pin(settlement::SettlementService::on_statistic_calculated(state, envelope)),
            },
        ],
        "CommandIssued" => &[Consumer {
            name: "command_dispatch",
            handler: |state, envelope| Box::pin(commands::CommandService::on_command_issued(state, envelope)),
        }],
        _ => &[],
    }
}

pub struct OutboxDispatcher;

impl OutboxDispatcher {
    /// Claims up to `config.outbox_batch_size` pending rows and drives each
    /// through decode -> consumer fan-out -> ack/dead-letter. Returns the
    /// number of rows processed, success or failure.
    #[instrument(skip(state))]
    pub async fn tick(state: &AppState) -> Result<usize, OrchestratorError> {
        let conn = state.db.connection()?;
        let rows = outbox::claim_batch(&conn, state.config.outbox_batch_size).await?;
        let processed = rows.len();

        for row in rows {
            let now = state.now();
            if let Err(error) = Self::dispatch_one(state, &row, now).await {
                warn!(event_id = %row.event_id, event_type = %row.event_type, %error, "routing row to dead-letter queue");
                outbox::dead_letter(&conn, row.id, &row.event_id, &row.event_type, &row.payload, &error.to_string(), now).await?;
                continue;
            }
            outbox::mark_sent(&conn, row.id, now).await?;
        }

        Ok(processed)
    }

    async fn dispatch_one(state: &AppState, row: &outbox::OutboxRow, now: chrono::DateTime<chrono::Utc>) -> Result<(), OrchestratorError> {
        let raw: RawEnvelope = serde_json::from_str(&row.payload).map_err(|e| gridforge_infra_db::DbError::Mapping(e.to_string()))?;
        let envelope = state.registry.decode(&raw)?;

        let conn = state.db.connection()?;
        for consumer in consumers_for(&row.event_type) {
            if processed_events::is_processed(&conn, &row.event_id, consumer.name).await? {
                info!(event_id = %row.event_id, consumer = consumer.name, "already processed, skipping");
                continue;
            }
            (consumer.handler)(state, &envelope).await?;
            processed_events::try_mark_processed(&conn, &row.event_id, consumer.name, now).await?;
        }
        Ok(())
    }
}

/// Wraps [`OutboxDispatcher::tick`] in the teacher's daemon-loop shape:
/// fixed tick interval, fire-and-forget, errors logged and swallowed so one
/// bad tick never brings the background task down.
pub fn spawn_dispatcher_loop(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(state.config.outbox_poll_interval);
        loop {
            ticker.tick().await;
            match OutboxDispatcher::tick(&state).await {
                Ok(0) => {}
                Ok(n) => info!(rows = n, "outbox dispatcher tick processed rows"),
                Err(error) => error!(%error, "outbox dispatcher tick failed"),
            }
        }
    })
}
