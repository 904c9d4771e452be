// [libs/infra/db/src/repositories/commands.rs]
use chrono::{DateTime, Duration, TimeZone, Utc};
use gridforge_domain_commands::{Command, CommandStatus};
use libsql::{params, Connection};
use tracing::instrument;

use crate::errors::DbError;

fn status_str(status: CommandStatus) -> &'static str {
    match status {
        CommandStatus::Created => "created",
        CommandStatus::Sent => "sent",
        CommandStatus::Acked => "acked",
        CommandStatus::Failed => "failed",
        CommandStatus::Timeout => "timeout",
    }
}

fn status_from_str(raw: &str) -> Result<CommandStatus, DbError> {
    match raw {
        "created" => Ok(CommandStatus::Created),
        "sent" => Ok(CommandStatus::Sent),
        "acked" => Ok(CommandStatus::Acked),
        "failed" => Ok(CommandStatus::Failed),
        "timeout" => Ok(CommandStatus::Timeout),
        other => Err(DbError::Mapping(format!("unknown command status '{other}'"))),
    }
}

fn to_utc(ts: i64) -> Result<DateTime<Utc>, DbError> {
    Utc.timestamp_opt(ts, 0).single().ok_or_else(|| DbError::Mapping("invalid timestamp".into()))
}

fn row_to_command(row: &libsql::Row) -> Result<Command, DbError> {
    let created_at: i64 = row.get(8).map_err(DbError::Query)?;
    let sent_at: Option<i64> = row.get(9).map_err(DbError::Query)?;
    let acked_at: Option<i64> = row.get(10).map_err(DbError::Query)?;
    let payload_raw: String = row.get(5).map_err(DbError::Query)?;

    Ok(Command {
        command_id: row.get(0).map_err(DbError::Query)?,
        tenant_id: row.get(1).map_err(DbError::Query)?,
        station_id: row.get(2).map_err(DbError::Query)?,
        device_id: row.get(3).map_err(DbError::Query)?,
        command_type: row.get(4).map_err(DbError::Query)?,
        payload: serde_json::from_str(&payload_raw).map_err(|e| DbError::Mapping(e.to_string()))?,
        idempotency_key: row.get(6).map_err(DbError::Query)?,
        status: status_from_str(&row.get::<String>(7).map_err(DbError::Query)?)?,
        created_at: to_utc(created_at)?,
        sent_at: sent_at.map(to_utc).transpose()?,
        acked_at: acked_at.map(to_utc).transpose()?,
        error: row.get(11).map_err(DbError::Query)?,
    })
}

const SELECT_COLUMNS: &str = "command_id, tenant_id, station_id, device_id, command_type, payload, idempotency_key, status, created_at, sent_at, acked_at, error";

/// The idempotency-window lookup (spec.md §4.9 step 2): the newest command
/// for (tenant, idempotency_key) created within `window` of `now`, if any.
#[instrument(skip(conn))]
pub async fn find_within_idempotency_window(conn: &Connection, tenant_id: &str, idempotency_key: &str, now: DateTime<Utc>, window: Duration) -> Result<Option<Command>, DbError> {
    let earliest = (now - window).timestamp();
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM commands WHERE tenant_id = ?1 AND idempotency_key = ?2 AND created_at >= ?3 ORDER BY created_at DESC LIMIT 1"
            ),
            params![tenant_id.to_string(), idempotency_key.to_string(), earliest],
        )
        .await
        .map_err(DbError::Query)?;

    match rows.next().await.map_err(DbError::Query)? {
        Some(row) => Ok(Some(row_to_command(&row)?)),
        None => Ok(None),
    }
}

/// Direct lookup by primary key, for the `command_dispatch` consumer
/// resolving an event's `command_id` back to its row.
#[instrument(skip(conn))]
pub async fn find_by_id(conn: &Connection, command_id: &str) -> Result<Option<Command>, DbError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLUMNS} FROM commands WHERE command_id = ?1"), params![command_id.to_string()])
        .await
        .map_err(DbError::Query)?;

    match rows.next().await.map_err(DbError::Query)? {
        Some(row) => Ok(Some(row_to_command(&row)?)),
        None => Ok(None),
    }
}

#[instrument(skip(conn, command))]
pub async fn insert(conn: &Connection, command: &Command) -> Result<(), DbError> {
    command.validate().map_err(|e| DbError::Mapping(e.to_string()))?;
    let payload = serde_json::to_string(&command.payload).map_err(|e| DbError::Mapping(e.to_string()))?;
    conn.execute(
        r#"
        INSERT INTO commands (command_id, tenant_id, station_id, device_id, command_type, payload, idempotency_key, status, created_at, sent_at, acked_at, error)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            command.command_id.clone(),
            command.tenant_id.clone(),
            command.station_id.clone(),
            command.device_id.clone(),
            command.command_type.clone(),
            payload,
            command.idempotency_key.clone(),
            status_str(command.status).to_string(),
            command.created_at.timestamp(),
            command.sent_at.map(|ts| ts.timestamp()),
            command.acked_at.map(|ts| ts.timestamp()),
            command.error.clone()
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

#[instrument(skip(conn, command))]
pub async fn update_status(conn: &Connection, command: &Command) -> Result<(), DbError> {
    conn.execute(
        "UPDATE commands SET status = ?2, sent_at = ?3, acked_at = ?4, error = ?5 WHERE command_id = ?1",
        params![
            command.command_id.clone(),
            status_str(command.status).to_string(),
            command.sent_at.map(|ts| ts.timestamp()),
            command.acked_at.map(|ts| ts.timestamp()),
            command.error.clone()
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

/// All SENT commands, for the timeout sweeper's periodic pass.
#[instrument(skip(conn))]
pub async fn list_sent(conn: &Connection) -> Result<Vec<Command>, DbError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLUMNS} FROM commands WHERE status = 'sent'"), ())
        .await
        .map_err(DbError::Query)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        out.push(row_to_command(&row)?);
    }
    Ok(out)
}
