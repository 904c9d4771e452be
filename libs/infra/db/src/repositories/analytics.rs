// [libs/infra/db/src/repositories/analytics.rs]
use chrono::{DateTime, TimeZone, Utc};
use gridforge_domain_analytics::StatisticAggregate;
use gridforge_domain_events::Granularity;
use libsql::{params, Connection};
use tracing::instrument;

use crate::errors::DbError;

fn granularity_str(granularity: Granularity) -> &'static str {
    granularity.as_str()
}

fn granularity_from_str(raw: &str) -> Result<Granularity, DbError> {
    match raw {
        "HOUR" => Ok(Granularity::Hour),
        "DAY" => Ok(Granularity::Day),
        "MONTH" => Ok(Granularity::Month),
        "YEAR" => Ok(Granularity::Year),
        other => Err(DbError::Mapping(format!("unknown granularity '{other}'"))),
    }
}

#[instrument(skip(conn))]
pub async fn load(conn: &Connection, subject_id: &str, granularity: Granularity, period_start: DateTime<Utc>) -> Result<Option<StatisticAggregate>, DbError> {
    let mut rows = conn
        .query(
            r#"
            SELECT charge_kwh, discharge_kwh, earnings, carbon_reduction, is_completed, completed_at, updated_at
            FROM statistic_aggregates WHERE subject_id = ?1 AND granularity = ?2 AND period_start = ?3
            "#,
            params![subject_id.to_string(), granularity_str(granularity).to_string(), period_start.timestamp()],
        )
        .await
        .map_err(DbError::Query)?;

    let Some(row) = rows.next().await.map_err(DbError::Query)? else {
        return Ok(None);
    };

    let charge_kwh: f64 = row.get(0).map_err(DbError::Query)?;
    let discharge_kwh: f64 = row.get(1).map_err(DbError::Query)?;
    let earnings: f64 = row.get(2).map_err(DbError::Query)?;
    let carbon_reduction: f64 = row.get(3).map_err(DbError::Query)?;
    let is_completed: i64 = row.get(4).map_err(DbError::Query)?;
    let completed_at: Option<i64> = row.get(5).map_err(DbError::Query)?;
    let updated_at: i64 = row.get(6).map_err(DbError::Query)?;

    Ok(Some(StatisticAggregate {
        subject_id: subject_id.to_string(),
        granularity,
        period_start,
        fact: gridforge_domain_analytics::StatisticFact {
            charge_kwh,
            discharge_kwh,
            earnings,
            carbon_reduction,
        },
        is_completed: is_completed != 0,
        completed_at: completed_at.map(|ts| Utc.timestamp_opt(ts, 0).single()).flatten(),
        updated_at: Utc.timestamp_opt(updated_at, 0).single().ok_or_else(|| DbError::Mapping("invalid timestamp".into()))?,
    }))
}

#[instrument(skip(conn, aggregate))]
pub async fn upsert(conn: &Connection, aggregate: &StatisticAggregate) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO statistic_aggregates
            (subject_id, granularity, period_start, charge_kwh, discharge_kwh, earnings, carbon_reduction, is_completed, completed_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT (subject_id, granularity, period_start) DO UPDATE SET
            charge_kwh = excluded.charge_kwh, discharge_kwh = excluded.discharge_kwh,
            earnings = excluded.earnings, carbon_reduction = excluded.carbon_reduction,
            is_completed = excluded.is_completed, completed_at = excluded.completed_at, updated_at = excluded.updated_at
        "#,
        params![
            aggregate.subject_id.clone(),
            granularity_str(aggregate.granularity).to_string(),
            aggregate.period_start.timestamp(),
            aggregate.fact.charge_kwh,
            aggregate.fact.discharge_kwh,
            aggregate.fact.earnings,
            aggregate.fact.carbon_reduction,
            aggregate.is_completed as i64,
            aggregate.completed_at.map(|ts| ts.timestamp()),
            aggregate.updated_at.timestamp()
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

/// All child-granularity aggregates within `[period_start, period_end)`
/// for a subject, used by the rollup step to feed `rollup_children`.
#[instrument(skip(conn))]
pub async fn load_children(conn: &Connection, subject_id: &str, child_granularity: Granularity, period_start: DateTime<Utc>, period_end: DateTime<Utc>) -> Result<Vec<StatisticAggregate>, DbError> {
    let mut rows = conn
        .query(
            r#"
            SELECT period_start, charge_kwh, discharge_kwh, earnings, carbon_reduction, is_completed, completed_at, updated_at
            FROM statistic_aggregates
            WHERE subject_id = ?1 AND granularity = ?2 AND period_start >= ?3 AND period_start < ?4
            ORDER BY period_start
            "#,
            params![subject_id.to_string(), granularity_str(child_granularity).to_string(), period_start.timestamp(), period_end.timestamp()],
        )
        .await
        .map_err(DbError::Query)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        let row_period_start: i64 = row.get(0).map_err(DbError::Query)?;
        let charge_kwh: f64 = row.get(1).map_err(DbError::Query)?;
        let discharge_kwh: f64 = row.get(2).map_err(DbError::Query)?;
        let earnings: f64 = row.get(3).map_err(DbError::Query)?;
        let carbon_reduction: f64 = row.get(4).map_err(DbError::Query)?;
        let is_completed: i64 = row.get(5).map_err(DbError::Query)?;
        let completed_at: Option<i64> = row.get(6).map_err(DbError::Query)?;
        let updated_at: i64 = row.get(7).map_err(DbError::Query)?;

        out.push(StatisticAggregate {
            subject_id: subject_id.to_string(),
            granularity: child_granularity,
            period_start: Utc.timestamp_opt(row_period_start, 0).single().ok_or_else(|| DbError::Mapping("invalid timestamp".into()))?,
            fact: gridforge_domain_analytics::StatisticFact {
                charge_kwh,
                discharge_kwh,
                earnings,
                carbon_reduction,
            },
            is_completed: is_completed != 0,
            completed_at: completed_at.map(|ts| Utc.timestamp_opt(ts, 0).single()).flatten(),
            updated_at: Utc.timestamp_opt(updated_at, 0).single().ok_or_else(|| DbError::Mapping("invalid timestamp".into()))?,
        });
    }
    Ok(out)
}

pub fn granularity_column(raw: &str) -> Result<Granularity, DbError> {
    granularity_from_str(raw)
}
