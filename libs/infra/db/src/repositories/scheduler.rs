// [libs/infra/db/src/repositories/scheduler.rs]
use chrono::{NaiveDate, NaiveTime};
use gridforge_domain_scheduler::{AntiBackflowParams, CalendarWindow, Mode, Strategy, TemplateType};
use libsql::{params, Connection};
use tracing::instrument;

use crate::errors::DbError;

fn mode_str(mode: Mode) -> &'static str {
    match mode {
        Mode::Auto => "auto",
        Mode::Manual => "manual",
    }
}

fn mode_from_str(raw: &str) -> Mode {
    match raw {
        "auto" => Mode::Auto,
        _ => Mode::Manual,
    }
}

fn template_type_str(template_type: TemplateType) -> &'static str {
    match template_type {
        TemplateType::AntiBackflow => "anti_backflow",
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| DbError::Mapping(e.to_string()))
}

fn parse_time(raw: &str) -> Result<NaiveTime, DbError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S").map_err(|e| DbError::Mapping(e.to_string()))
}

/// All enabled AUTO-mode strategies, for the minute-tick scheduler sweep
/// (spec.md §4.10 step 1).
#[instrument(skip(conn))]
pub async fn load_enabled_auto_strategies(conn: &Connection) -> Result<Vec<Strategy>, DbError> {
    let mut rows = conn
        .query(
            "SELECT tenant_id, station_id, mode, template_type, threshold_kw, min_kw, max_kw FROM strategies WHERE enabled = 1 AND mode = 'auto'",
            (),
        )
        .await
        .map_err(DbError::Query)?;

    let mut strategies = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        let tenant_id: String = row.get(0).map_err(DbError::Query)?;
        let station_id: String = row.get(1).map_err(DbError::Query)?;
        let mode = mode_from_str(&row.get::<String>(2).map_err(DbError::Query)?);
        let calendar_windows = load_calendar_windows(conn, &tenant_id, &station_id).await?;
        strategies.push(Strategy {
            tenant_id,
            station_id,
            mode,
            enabled: true,
            template_type: TemplateType::AntiBackflow,
            template_params: AntiBackflowParams {
                threshold_kw: row.get(4).map_err(DbError::Query)?,
                min_kw: row.get(5).map_err(DbError::Query)?,
                max_kw: row.get(6).map_err(DbError::Query)?,
            },
            calendar_windows,
        });
    }
    Ok(strategies)
}

#[instrument(skip(conn))]
pub async fn load_calendar_windows(conn: &Connection, tenant_id: &str, station_id: &str) -> Result<Vec<CalendarWindow>, DbError> {
    let mut rows = conn
        .query(
            "SELECT window_date, enabled, start_time, end_time FROM calendar_windows WHERE tenant_id = ?1 AND station_id = ?2",
            params![tenant_id.to_string(), station_id.to_string()],
        )
        .await
        .map_err(DbError::Query)?;

    let mut windows = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        let date_raw: String = row.get(0).map_err(DbError::Query)?;
        let enabled: i64 = row.get(1).map_err(DbError::Query)?;
        let start_raw: String = row.get(2).map_err(DbError::Query)?;
        let end_raw: String = row.get(3).map_err(DbError::Query)?;
        windows.push(CalendarWindow {
            date: parse_date(&date_raw)?,
            enabled: enabled != 0,
            start_time: parse_time(&start_raw)?,
            end_time: parse_time(&end_raw)?,
        });
    }
    Ok(windows)
}

#[instrument(skip(conn, strategy))]
pub async fn upsert_strategy(conn: &Connection, strategy: &Strategy) -> Result<(), DbError> {
    let tx = conn.transaction().await.map_err(DbError::Query)?;
    tx.execute(
        r#"
        INSERT INTO strategies (tenant_id, station_id, mode, enabled, template_type, threshold_kw, min_kw, max_kw)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT (tenant_id, station_id) DO UPDATE SET
            mode = excluded.mode, enabled = excluded.enabled, template_type = excluded.template_type,
            threshold_kw = excluded.threshold_kw, min_kw = excluded.min_kw, max_kw = excluded.max_kw
        "#,
        params![
            strategy.tenant_id.clone(),
            strategy.station_id.clone(),
            mode_str(strategy.mode).to_string(),
            strategy.enabled as i64,
            template_type_str(strategy.template_type).to_string(),
            strategy.template_params.threshold_kw,
            strategy.template_params.min_kw,
            strategy.template_params.max_kw
        ],
    )
    .await
    .map_err(DbError::Query)?;

    for window in &strategy.calendar_windows {
        tx.execute(
            r#"
            INSERT INTO calendar_windows (tenant_id, station_id, window_date, enabled, start_time, end_time)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (tenant_id, station_id, window_date) DO UPDATE SET
                enabled = excluded.enabled, start_time = excluded.start_time, end_time = excluded.end_time
            "#,
            params![
                strategy.tenant_id.clone(),
                strategy.station_id.clone(),
                window.date.format("%Y-%m-%d").to_string(),
                window.enabled as i64,
                window.start_time.format("%H:%M:%S").to_string(),
                window.end_time.format("%H:%M:%S").to_string()
            ],
        )
        .await
        .map_err(DbError::Query)?;
    }
    tx.commit().await.map_err(DbError::Query)?;
    Ok(())
}
