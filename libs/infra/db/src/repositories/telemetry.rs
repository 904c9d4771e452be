// [libs/infra/db/src/repositories/telemetry.rs]
use chrono::{DateTime, TimeZone, Utc};
use gridforge_domain_telemetry::{Measurement, MeasurementValue, Quality};
use libsql::{params, Connection};
use tracing::instrument;

use crate::errors::DbError;

fn quality_str(quality: Quality) -> &'static str {
    match quality {
        Quality::Good => "good",
        Quality::Uncertain => "uncertain",
        Quality::Bad => "bad",
    }
}

fn quality_from_str(raw: &str) -> Quality {
    match raw {
        "uncertain" => Quality::Uncertain,
        "bad" => Quality::Bad,
        _ => Quality::Good,
    }
}

/// Upsert-on-conflict time-series sink keyed by the full identity tuple
/// (C1, spec.md §4.4). A second upsert of the same tuple overwrites
/// value/quality and leaves exactly one row (the "idempotent ingest" law).
#[instrument(skip(conn, measurement))]
pub async fn upsert_measurement(conn: &Connection, measurement: &Measurement, now: DateTime<Utc>) -> Result<(), DbError> {
    measurement
        .validate()
        .map_err(|e| DbError::Mapping(e.to_string()))?;

    let (value_numeric, value_text) = match &measurement.value {
        MeasurementValue::Numeric(v) => (Some(*v), None),
        MeasurementValue::Text(t) => (None, Some(t.clone())),
    };

    conn.execute(
        r#"
        INSERT INTO measurements (tenant_id, station_id, device_id, point_key, ts, value_numeric, value_text, quality, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT (tenant_id, station_id, device_id, point_key, ts)
        DO UPDATE SET value_numeric = excluded.value_numeric, value_text = excluded.value_text,
                      quality = excluded.quality, updated_at = excluded.updated_at
        "#,
        params![
            measurement.tenant_id.clone(),
            measurement.station_id.clone(),
            measurement.device_id.clone(),
            measurement.point_key.clone(),
            measurement.ts.timestamp(),
            value_numeric,
            value_text,
            quality_str(measurement.quality).to_string(),
            now.timestamp()
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

/// The freshest sample for a single point key, across every device that
/// reports it, for the scheduler's minute tick (spec.md §4.10 step 1).
#[instrument(skip(conn))]
pub async fn query_latest(conn: &Connection, tenant_id: &str, station_id: &str, point_key: &str) -> Result<Option<Measurement>, DbError> {
    let mut rows = conn
        .query(
            r#"
            SELECT device_id, ts, value_numeric, value_text, quality
            FROM measurements
            WHERE tenant_id = ?1 AND station_id = ?2 AND point_key = ?3
            ORDER BY ts DESC LIMIT 1
            "#,
            params![tenant_id.to_string(), station_id.to_string(), point_key.to_string()],
        )
        .await
        .map_err(DbError::Query)?;

    let Some(row) = rows.next().await.map_err(DbError::Query)? else {
        return Ok(None);
    };
    let device_id: String = row.get(0).map_err(DbError::Query)?;
    let ts: i64 = row.get(1).map_err(DbError::Query)?;
    let value_numeric: Option<f64> = row.get(2).map_err(DbError::Query)?;
    let value_text: Option<String> = row.get(3).map_err(DbError::Query)?;
    let quality: String = row.get(4).map_err(DbError::Query)?;

    let value = match (value_numeric, value_text) {
        (Some(v), _) => MeasurementValue::Numeric(v),
        (None, Some(t)) => MeasurementValue::Text(t),
        (None, None) => return Ok(None),
    };

    Ok(Some(Measurement {
        tenant_id: tenant_id.to_string(),
        station_id: station_id.to_string(),
        device_id,
        point_key: point_key.to_string(),
        ts: Utc.timestamp_opt(ts, 0).single().ok_or_else(|| DbError::Mapping("invalid timestamp".into()))?,
        value,
        quality: quality_from_str(&quality),
    }))
}

/// All measurements for a station within `[window_start, window_end)`,
/// across every device (spec.md §4.6 step 2).
#[instrument(skip(conn))]
pub async fn query_window(conn: &Connection, tenant_id: &str, station_id: &str, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Result<Vec<Measurement>, DbError> {
    let mut rows = conn
        .query(
            r#"
            SELECT device_id, point_key, ts, value_numeric, value_text, quality
            FROM measurements
            WHERE tenant_id = ?1 AND station_id = ?2 AND ts >= ?3 AND ts < ?4
            "#,
            params![tenant_id.to_string(), station_id.to_string(), window_start.timestamp(), window_end.timestamp()],
        )
        .await
        .map_err(DbError::Query)?;

    let mut measurements = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        let device_id: String = row.get(0).map_err(DbError::Query)?;
        let point_key: String = row.get(1).map_err(DbError::Query)?;
        let ts: i64 = row.get(2).map_err(DbError::Query)?;
        let value_numeric: Option<f64> = row.get(3).map_err(DbError::Query)?;
        let value_text: Option<String> = row.get(4).map_err(DbError::Query)?;
        let quality: String = row.get(5).map_err(DbError::Query)?;

        let value = match (value_numeric, value_text) {
            (Some(v), _) => MeasurementValue::Numeric(v),
            (None, Some(t)) => MeasurementValue::Text(t),
            (None, None) => continue,
        };

        measurements.push(Measurement {
            tenant_id: tenant_id.to_string(),
            station_id: station_id.to_string(),
            device_id,
            point_key,
            ts: Utc.timestamp_opt(ts, 0).single().ok_or_else(|| DbError::Mapping("invalid timestamp".into()))?,
            value,
            quality: quality_from_str(&quality),
        });
    }
    Ok(measurements)
}
