// [libs/infra/db/src/repositories/shadowrun.rs]
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gridforge_domain_shadowrun::{JobStatus, RecommendedAction, ShadowAlert, ShadowJob, ShadowReport};
use libsql::{params, Connection};
use tracing::instrument;

use crate::errors::DbError;

fn job_status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Created => "created",
        JobStatus::Running => "running",
        JobStatus::Succeeded => "succeeded",
        JobStatus::Failed => "failed",
    }
}

fn job_status_from_str(raw: &str) -> JobStatus {
    match raw {
        "running" => JobStatus::Running,
        "succeeded" => JobStatus::Succeeded,
        "failed" => JobStatus::Failed,
        _ => JobStatus::Created,
    }
}

fn action_str(action: RecommendedAction) -> &'static str {
    match action {
        RecommendedAction::ReplayMissingHours => "replay_missing_hours",
        RecommendedAction::CheckMappingOrTariff => "check_mapping_or_tariff",
        RecommendedAction::CheckTariffOrSettlement => "check_tariff_or_settlement",
        RecommendedAction::None => "none",
    }
}

fn action_from_str(raw: &str) -> RecommendedAction {
    match raw {
        "replay_missing_hours" => RecommendedAction::ReplayMissingHours,
        "check_mapping_or_tariff" => RecommendedAction::CheckMappingOrTariff,
        "check_tariff_or_settlement" => RecommendedAction::CheckTariffOrSettlement,
        _ => RecommendedAction::None,
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| DbError::Mapping(e.to_string()))
}

fn to_utc(ts: i64) -> Result<DateTime<Utc>, DbError> {
    Utc.timestamp_opt(ts, 0).single().ok_or_else(|| DbError::Mapping("invalid timestamp".into()))
}

/// Inserts a new job row, or returns the already-running job unchanged if
/// one exists for the same identity (spec.md §4.11 step 1, `AlreadyRunning`).
#[instrument(skip(conn, job))]
pub async fn insert_job(conn: &Connection, job: &ShadowJob) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO shadow_jobs (tenant_id, station_id, statement_month, job_date, job_type, status, error)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (tenant_id, station_id, statement_month, job_date, job_type) DO UPDATE SET
            status = excluded.status, error = excluded.error
        "#,
        params![
            job.tenant_id.clone(),
            job.station_id.clone(),
            job.month.timestamp(),
            job.job_date.format("%Y-%m-%d").to_string(),
            job.job_type.clone(),
            job_status_str(job.status).to_string(),
            job.error.clone()
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

#[instrument(skip(conn))]
pub async fn find_job(conn: &Connection, tenant_id: &str, station_id: &str, month: DateTime<Utc>, job_date: NaiveDate) -> Result<Option<ShadowJob>, DbError> {
    let mut rows = conn
        .query(
            "SELECT status, error FROM shadow_jobs WHERE tenant_id = ?1 AND station_id = ?2 AND statement_month = ?3 AND job_date = ?4 AND job_type = 'shadowrun'",
            params![tenant_id.to_string(), station_id.to_string(), month.timestamp(), job_date.format("%Y-%m-%d").to_string()],
        )
        .await
        .map_err(DbError::Query)?;

    let Some(row) = rows.next().await.map_err(DbError::Query)? else {
        return Ok(None);
    };
    Ok(Some(ShadowJob {
        tenant_id: tenant_id.to_string(),
        station_id: station_id.to_string(),
        month,
        job_date,
        job_type: "shadowrun".to_string(),
        status: job_status_from_str(&row.get::<String>(0).map_err(DbError::Query)?),
        error: row.get(1).map_err(DbError::Query)?,
    }))
}

#[instrument(skip(conn, report))]
pub async fn insert_report(conn: &Connection, report: &ShadowReport, now: DateTime<Utc>) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO shadow_reports (tenant_id, station_id, statement_month, diff_energy_max, diff_amount_max, missing_hours_total, recommended_action, archive_path, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            report.tenant_id.clone(),
            report.station_id.clone(),
            report.month.timestamp(),
            report.diff_energy_max,
            report.diff_amount_max,
            report.missing_hours_total as i64,
            action_str(report.recommended_action).to_string(),
            report.archive_path.clone(),
            now.timestamp()
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

#[instrument(skip(conn, alert))]
pub async fn insert_alert(conn: &Connection, alert: &ShadowAlert) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO shadow_alerts (tenant_id, station_id, statement_month, recommended_action, raised_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (tenant_id, station_id, statement_month, raised_at) DO NOTHING
        "#,
        params![
            alert.tenant_id.clone(),
            alert.station_id.clone(),
            alert.month.timestamp(),
            action_str(alert.recommended_action).to_string(),
            alert.raised_at.timestamp()
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

pub fn parse_job_date(raw: &str) -> Result<NaiveDate, DbError> {
    parse_date(raw)
}

pub fn recommended_action_from_column(raw: &str) -> RecommendedAction {
    action_from_str(raw)
}

pub fn timestamp_to_utc(ts: i64) -> Result<DateTime<Utc>, DbError> {
    to_utc(ts)
}
