// [libs/infra/db/src/repositories/outbox.rs]
//! Transactional outbox + dead-letter queue (C4). libsql has neither
//! `SELECT ... FOR UPDATE SKIP LOCKED` nor `UPDATE ... RETURNING`, so a
//! batch claim is two statements inside one transaction: an `UPDATE`
//! that stamps a claim token on the oldest pending rows, followed by a
//! `SELECT` of exactly the rows carrying that token.

use chrono::{DateTime, TimeZone, Utc};
use gridforge_domain_events::envelope::RawEnvelope;
use libsql::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::DbError;

pub struct OutboxRow {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub payload: String,
    pub attempts: i64,
}

/// Appends an event to the outbox. Call this inside the same
/// transaction as the business write it accompanies so publication is
/// atomic with the state change that produced the event.
#[instrument(skip(conn, raw))]
pub async fn insert(conn: &Connection, raw: &RawEnvelope, now: DateTime<Utc>) -> Result<(), DbError> {
    let payload = serde_json::to_string(raw).map_err(|e| DbError::Mapping(e.to_string()))?;
    conn.execute(
        r#"
        INSERT INTO outbox (event_id, event_type, tenant_id, station_id, payload, status, attempts, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 'pending', 0, ?6)
        ON CONFLICT (event_id) DO NOTHING
        "#,
        params![
            raw.event_id.to_string(),
            raw.event_type.clone(),
            raw.tenant_id.clone(),
            raw.station_id.clone(),
            payload,
            now.timestamp()
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

/// Claims up to `limit` pending rows for this dispatcher instance,
/// oldest first, and returns them. Rows already claimed by another
/// in-flight dispatcher tick are invisible to this call.
#[instrument(skip(conn))]
pub async fn claim_batch(conn: &Connection, limit: i64) -> Result<Vec<OutboxRow>, DbError> {
    let claim_token = Uuid::new_v4().to_string();
    let tx = conn.transaction().await.map_err(DbError::Query)?;

    tx.execute(
        r#"
        UPDATE outbox SET status = 'claimed', claimed_by = ?1
        WHERE id IN (
            SELECT id FROM outbox WHERE status = 'pending' ORDER BY created_at, id LIMIT ?2
        )
        "#,
        params![claim_token.clone(), limit],
    )
    .await
    .map_err(DbError::Query)?;

    let mut rows = tx
        .query(
            "SELECT id, event_id, event_type, payload, attempts FROM outbox WHERE claimed_by = ?1 ORDER BY created_at, id",
            params![claim_token],
        )
        .await
        .map_err(DbError::Query)?;

    let mut claimed = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        claimed.push(OutboxRow {
            id: row.get(0).map_err(DbError::Query)?,
            event_id: row.get(1).map_err(DbError::Query)?,
            event_type: row.get(2).map_err(DbError::Query)?,
            payload: row.get(3).map_err(DbError::Query)?,
            attempts: row.get(4).map_err(DbError::Query)?,
        });
    }
    drop(rows);
    tx.commit().await.map_err(DbError::Query)?;
    Ok(claimed)
}

#[instrument(skip(conn))]
pub async fn mark_sent(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<(), DbError> {
    conn.execute(
        "UPDATE outbox SET status = 'sent', sent_at = ?2 WHERE id = ?1",
        params![id, now.timestamp()],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

/// Reverts a claimed row back to pending with its attempt count bumped,
/// so the next dispatcher tick retries it.
#[instrument(skip(conn))]
pub async fn mark_retry(conn: &Connection, id: i64) -> Result<(), DbError> {
    conn.execute(
        "UPDATE outbox SET status = 'pending', claimed_by = NULL, attempts = attempts + 1 WHERE id = ?1",
        params![id],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

#[instrument(skip(conn))]
pub async fn attempts(conn: &Connection, id: i64) -> Result<i64, DbError> {
    let mut rows = conn
        .query("SELECT attempts FROM outbox WHERE id = ?1", params![id])
        .await
        .map_err(DbError::Query)?;
    match rows.next().await.map_err(DbError::Query)? {
        Some(row) => row.get(0).map_err(DbError::Query),
        None => Err(DbError::NotFound),
    }
}

/// Moves a poison-pill event to the dead-letter queue, upserting the
/// attempt count if the same event is dead-lettered more than once.
#[instrument(skip(conn, payload, error))]
pub async fn dead_letter(conn: &Connection, id: i64, event_id: &str, event_type: &str, payload: &str, error: &str, now: DateTime<Utc>) -> Result<(), DbError> {
    let tx = conn.transaction().await.map_err(DbError::Query)?;

    tx.execute(
        r#"
        INSERT INTO dead_letters (event_id, event_type, payload, error, first_seen_at, last_seen_at, attempts)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5, 1)
        ON CONFLICT (event_id) DO UPDATE SET
            error = excluded.error, last_seen_at = excluded.last_seen_at, attempts = dead_letters.attempts + 1
        "#,
        params![event_id.to_string(), event_type.to_string(), payload.to_string(), error.to_string(), now.timestamp()],
    )
    .await
    .map_err(DbError::Query)?;

    tx.execute("UPDATE outbox SET status = 'dead' WHERE id = ?1", params![id])
        .await
        .map_err(DbError::Query)?;

    tx.commit().await.map_err(DbError::Query)?;
    Ok(())
}

pub struct DeadLetterRow {
    pub event_id: String,
    pub event_type: String,
    pub payload: String,
    pub error: String,
    pub attempts: i64,
}

#[instrument(skip(conn))]
pub async fn list_dead_letters(conn: &Connection) -> Result<Vec<DeadLetterRow>, DbError> {
    let mut rows = conn
        .query("SELECT event_id, event_type, payload, error, attempts FROM dead_letters ORDER BY last_seen_at", ())
        .await
        .map_err(DbError::Query)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        out.push(DeadLetterRow {
            event_id: row.get(0).map_err(DbError::Query)?,
            event_type: row.get(1).map_err(DbError::Query)?,
            payload: row.get(2).map_err(DbError::Query)?,
            error: row.get(3).map_err(DbError::Query)?,
            attempts: row.get(4).map_err(DbError::Query)?,
        });
    }
    Ok(out)
}

/// Requeues a dead-lettered event back onto the outbox for another
/// dispatch attempt (operator-triggered via the dlq-tool binary).
#[instrument(skip(conn))]
pub async fn replay_dead_letter(conn: &Connection, event_id: &str, now: DateTime<Utc>) -> Result<(), DbError> {
    let tx = conn.transaction().await.map_err(DbError::Query)?;

    let mut rows = tx
        .query(
            "SELECT event_type, payload FROM dead_letters WHERE event_id = ?1",
            params![event_id.to_string()],
        )
        .await
        .map_err(DbError::Query)?;
    let Some(row) = rows.next().await.map_err(DbError::Query)? else {
        return Err(DbError::NotFound);
    };
    let event_type: String = row.get(0).map_err(DbError::Query)?;
    let payload: String = row.get(1).map_err(DbError::Query)?;
    drop(rows);

    tx.execute(
        "UPDATE outbox SET status = 'pending', claimed_by = NULL, attempts = 0 WHERE event_id = ?1",
        params![event_id.to_string()],
    )
    .await
    .map_err(DbError::Query)?;
    tx.execute("DELETE FROM dead_letters WHERE event_id = ?1", params![event_id.to_string()])
        .await
        .map_err(DbError::Query)?;

    let _ = (event_type, payload, now.timestamp());
    tx.commit().await.map_err(DbError::Query)?;
    Ok(())
}

pub fn timestamp_to_utc(ts: i64) -> Result<DateTime<Utc>, DbError> {
    Utc.timestamp_opt(ts, 0).single().ok_or_else(|| DbError::Mapping("invalid timestamp".into()))
}
