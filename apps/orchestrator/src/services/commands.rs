// [apps/orchestrator/src/services/commands.rs]
//! C9: idempotent command issue, the `command_dispatch` consumer that drives
//! a CREATED command through the device-gateway RPC, and the timeout
//! sweeper. Grounded on `gridforge_domain_commands::command` for the state
//! machine and on `services/ingest.rs` for the write-then-publish
//! transaction shape.

use chrono::{DateTime, Utc};
use gridforge_domain_commands::{apply_rpc_result, issue, mark_sent, sweep_timeout, CommandStatus, IssueOutcome, RpcResult};
use gridforge_domain_events::payload::{CommandAcked, CommandFailed, CommandIssued};
use gridforge_domain_events::{DomainEvent, EventEnvelope};
use gridforge_infra_db::repositories::{commands, outbox};
use tokio::time::interval;
use tracing::{error, info, instrument, warn};

use crate::errors::OrchestratorError;
use crate::state::AppState;

pub struct CommandService;

impl CommandService {
    /// Issues a command, short-circuiting to the existing row when one
    /// within the idempotency window already covers this (tenant,
    /// idempotency_key) pair (spec.md §4.9 steps 1-2).
    #[instrument(skip(state, payload))]
    #[allow(clippy::too_many_arguments)]
    pub async fn issue(
        state: &AppState,
        tenant_id: &str,
        station_id: &str,
        device_id: &str,
        command_type: &str,
        payload: serde_json::Value,
        idempotency_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        let conn = state.db.connection()?;
        let key = gridforge_domain_commands::resolve_idempotency_key(idempotency_key, &payload);
        let existing = commands::find_within_idempotency_window(&conn, tenant_id, &key, now, state.config.idempotency_window).await?;

        let command_id = gridforge_core_clock::Ids::new_event_id().to_string();
        let outcome = issue(command_id, existing.as_ref(), tenant_id, station_id, device_id, command_type, payload, idempotency_key, now);
        let IssueOutcome::Created(command) = outcome else {
            info!(%tenant_id, idempotency_key = %key, "command issue matched an existing row within the idempotency window");
            return Ok(());
        };

        let envelope = EventEnvelope::new(
            DomainEvent::CommandIssued(CommandIssued {
                command_id: command.command_id.clone(),
                tenant_id: command.tenant_id.clone(),
                station_id: command.station_id.clone(),
                device_id: command.device_id.clone(),
                command_type: command.command_type.clone(),
                payload: command.payload.clone(),
                occurred_at: now,
            }),
            None,
            now,
        );
        let raw = envelope.to_raw()?;

        let tx = conn.transaction().await.map_err(gridforge_infra_db::DbError::Query)?;
        commands::insert(&tx, &command).await?;
        outbox::insert(&tx, &raw, now).await?;
        tx.commit().await.map_err(gridforge_infra_db::DbError::Query)?;
        Ok(())
    }

    /// `command_dispatch` consumer: marks the command SENT, calls out to the
    /// device gateway, and persists the terminal state the RPC result
    /// implies (spec.md §4.9 steps 3-5). A gateway failure is a domain
    /// outcome (`RpcResult::Failed`), not a dispatch error — it is recorded
    /// on the command and published as `CommandFailed`, never dead-lettered.
    pub async fn on_command_issued(state: &AppState, envelope: &EventEnvelope) -> Result<(), OrchestratorError> {
        let DomainEvent::CommandIssued(event) = &envelope.payload else {
            return Ok(());
        };
        let now = state.now();
        let conn = state.db.connection()?;
        Self::dispatch_by_id(state, &conn, &event.command_id, now).await
    }

    async fn dispatch_by_id(state: &AppState, conn: &libsql::Connection, command_id: &str, now: DateTime<Utc>) -> Result<(), OrchestratorError> {
        let Some(command) = commands::find_by_id(conn, command_id).await? else {
            warn!(%command_id, "command_dispatch consumer could not find the command row, skipping");
            return Ok(());
        };
        if command.status != CommandStatus::Created {
            return Ok(());
        }

        let sent = mark_sent(&command, now);
        commands::update_status(conn, &sent).await?;

        let rpc_result = match state.device_client.send_command(&sent).await {
            Ok(result) => result,
            Err(error) => RpcResult::Failed(error.to_string()),
        };
        let final_command = apply_rpc_result(&sent, rpc_result, now);

        let outbound = match final_command.status {
            CommandStatus::Acked => Some(DomainEvent::CommandAcked(CommandAcked {
                command_id: final_command.command_id.clone(),
                tenant_id: final_command.tenant_id.clone(),
                station_id: final_command.station_id.clone(),
                device_id: final_command.device_id.clone(),
                occurred_at: now,
            })),
            CommandStatus::Failed => Some(DomainEvent::CommandFailed(CommandFailed {
                command_id: final_command.command_id.clone(),
                tenant_id: final_command.tenant_id.clone(),
                station_id: final_command.station_id.clone(),
                device_id: final_command.device_id.clone(),
                error: final_command.error.clone().unwrap_or_default(),
                occurred_at: now,
            })),
            // `RpcResult::Sent` leaves the command in SENT, waiting on an ack
            // that arrives out of band (a future inbound webhook) or on the
            // timeout sweeper.
            _ => None,
        };
        let tx = conn.transaction().await.map_err(gridforge_infra_db::DbError::Query)?;
        commands::update_status(&tx, &final_command).await?;
        if let Some(event) = outbound {
            let envelope = EventEnvelope::new(event, None, now);
            outbox::insert(&tx, &envelope.to_raw()?, now).await?;
        }
        tx.commit().await.map_err(gridforge_infra_db::DbError::Query)?;
        Ok(())
    }
}

/// Timeout sweeper daemon: every tick, moves SENT commands older than
/// `command_timeout` to TIMEOUT (spec.md §4.9 step 5).
pub fn spawn_command_sweeper_loop(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(state.config.command_sweep_interval);
        loop {
            ticker.tick().await;
            if let Err(error) = run_sweep(&state).await {
                error!(%error, "command timeout sweep failed");
            }
        }
    })
}

async fn run_sweep(state: &AppState) -> Result<(), OrchestratorError> {
    let now = state.now();
    let conn = state.db.connection()?;
    let sent = commands::list_sent(&conn).await?;
    for command in sent {
        if let Some(timed_out) = sweep_timeout(&command, now, state.config.command_timeout) {
            commands::update_status(&conn, &timed_out).await?;
        }
    }
    Ok(())
}
