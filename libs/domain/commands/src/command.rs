// [libs/domain/commands/src/command.rs]
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CommandError;
use crate::idempotency::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    Created,
    Sent,
    Acked,
    Failed,
    Timeout,
}

/// (command_id) with status machine {CREATED → SENT → (ACKED|FAILED|TIMEOUT)}
/// (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub command_id: String,
    pub tenant_id: String,
    pub station_id: String,
    pub device_id: String,
    pub command_type: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
    pub status: CommandStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub acked_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Command {
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.command_type.is_empty() {
            return Err(CommandError::EmptyCommandType);
        }
        if self.device_id.is_empty() {
            return Err(CommandError::EmptyDeviceId);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IssueOutcome {
    /// A prior command within the idempotency window was returned as-is; no
    /// new row, no new dispatch (spec.md §4.9 step 2).
    Existing(Command),
    Created(Command),
}

#[allow(clippy::too_many_arguments)]
pub fn issue(
    command_id: String,
    existing_within_window: Option<&Command>,
    tenant_id: &str,
    station_id: &str,
    device_id: &str,
    command_type: &str,
    payload: serde_json::Value,
    idempotency_key: Option<&str>,
    now: DateTime<Utc>,
) -> IssueOutcome {
    if let Some(existing) = existing_within_window {
        return IssueOutcome::Existing(existing.clone());
    }

    let key = resolve(idempotency_key, &payload);
    IssueOutcome::Created(Command {
        command_id,
        tenant_id: tenant_id.to_string(),
        station_id: station_id.to_string(),
        device_id: device_id.to_string(),
        command_type: command_type.to_string(),
        payload,
        idempotency_key: key,
        status: CommandStatus::Created,
        created_at: now,
        sent_at: None,
        acked_at: None,
        error: None,
    })
}

/// True when `candidate` is a match for an idempotent re-issue: same
/// (tenant, idempotency_key) and created within `window` of `now`
/// (spec.md §4.9 step 2). The actual lookup is a database query in
/// `gridforge-infra-db`; this predicate is what it filters by.
pub fn is_within_idempotency_window(candidate: &Command, tenant_id: &str, idempotency_key: &str, now: DateTime<Utc>, window: Duration) -> bool {
    candidate.tenant_id == tenant_id && candidate.idempotency_key == idempotency_key && now - candidate.created_at <= window
}

pub fn mark_sent(command: &Command, now: DateTime<Utc>) -> Command {
    Command {
        status: CommandStatus::Sent,
        sent_at: Some(now),
        ..command.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RpcResult {
    Acked,
    Sent,
    Failed(String),
}

/// Applies the device-gateway RPC result to a SENT command (spec.md §4.9
/// steps 3-5).
pub fn apply_rpc_result(command: &Command, result: RpcResult, now: DateTime<Utc>) -> Command {
    match result {
        RpcResult::Acked => Command {
            status: CommandStatus::Acked,
            acked_at: Some(now),
            ..command.clone()
        },
        RpcResult::Failed(error) => Command {
            status: CommandStatus::Failed,
            error: Some(error),
            ..command.clone()
        },
        RpcResult::Sent => command.clone(),
    }
}

/// The timeout sweeper: SENT → TIMEOUT once `sent_at` is older than
/// `timeout` (spec.md §4.9 step 5). Returns `None` for commands the sweeper
/// should leave alone.
pub fn sweep_timeout(command: &Command, now: DateTime<Utc>, timeout: Duration) -> Option<Command> {
    if command.status != CommandStatus::Sent {
        return None;
    }
    let sent_at = command.sent_at?;
    if now - sent_at < timeout {
        return None;
    }
    Some(Command {
        status: CommandStatus::Timeout,
        ..command.clone()
    })
}
