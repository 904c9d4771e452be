// [libs/infra/db/src/repositories/processed_events.rs]
//! Per-consumer idempotency ledger (C5): each consumer claims an event
//! exactly once via `INSERT OR IGNORE` on `(event_id, consumer_name)`,
//! so a redelivered event is a guaranteed no-op for a consumer that
//! already recorded it.

use chrono::{DateTime, Utc};
use libsql::{params, Connection};
use tracing::instrument;

use crate::errors::DbError;

/// Returns `true` if this call is the first to mark `event_id` processed
/// for `consumer_name`; `false` if that consumer already processed it.
#[instrument(skip(conn))]
pub async fn try_mark_processed(conn: &Connection, event_id: &str, consumer_name: &str, now: DateTime<Utc>) -> Result<bool, DbError> {
    let changed = conn
        .execute(
            "INSERT OR IGNORE INTO processed_events (event_id, consumer_name, processed_at) VALUES (?1, ?2, ?3)",
            params![event_id.to_string(), consumer_name.to_string(), now.timestamp()],
        )
        .await
        .map_err(DbError::Query)?;
    Ok(changed > 0)
}

#[instrument(skip(conn))]
pub async fn is_processed(conn: &Connection, event_id: &str, consumer_name: &str) -> Result<bool, DbError> {
    let mut rows = conn
        .query(
            "SELECT 1 FROM processed_events WHERE event_id = ?1 AND consumer_name = ?2",
            params![event_id.to_string(), consumer_name.to_string()],
        )
        .await
        .map_err(DbError::Query)?;
    Ok(rows.next().await.map_err(DbError::Query)?.is_some())
}
