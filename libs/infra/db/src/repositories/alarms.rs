// [libs/infra/db/src/repositories/alarms.rs]
use chrono::{DateTime, TimeZone, Utc};
use gridforge_domain_alarms::{Alarm, AlarmRule, AlarmStatus, Operator, OriginatorType, RuleState, Severity};
use gridforge_domain_telemetry::Semantic;
use libsql::{params, Connection};
use tracing::instrument;

use crate::errors::DbError;

fn operator_str(op: Operator) -> &'static str {
    match op {
        Operator::Gt => "gt",
        Operator::Ge => "ge",
        Operator::Lt => "lt",
        Operator::Le => "le",
    }
}

fn operator_from_str(raw: &str) -> Result<Operator, DbError> {
    match raw {
        "gt" => Ok(Operator::Gt),
        "ge" => Ok(Operator::Ge),
        "lt" => Ok(Operator::Lt),
        "le" => Ok(Operator::Le),
        other => Err(DbError::Mapping(format!("unknown operator '{other}'"))),
    }
}

fn severity_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
        Severity::Critical => "critical",
    }
}

fn severity_from_str(raw: &str) -> Result<Severity, DbError> {
    match raw {
        "low" => Ok(Severity::Low),
        "medium" => Ok(Severity::Medium),
        "high" => Ok(Severity::High),
        "critical" => Ok(Severity::Critical),
        other => Err(DbError::Mapping(format!("unknown severity '{other}'"))),
    }
}

fn originator_str(originator: OriginatorType) -> &'static str {
    match originator {
        OriginatorType::Device => "device",
        OriginatorType::Station => "station",
    }
}

fn originator_from_str(raw: &str) -> Result<OriginatorType, DbError> {
    match raw {
        "device" => Ok(OriginatorType::Device),
        "station" => Ok(OriginatorType::Station),
        other => Err(DbError::Mapping(format!("unknown originator type '{other}'"))),
    }
}

fn alarm_status_str(status: AlarmStatus) -> &'static str {
    match status {
        AlarmStatus::Active => "active",
        AlarmStatus::Acknowledged => "acknowledged",
        AlarmStatus::Cleared => "cleared",
    }
}

fn alarm_status_from_str(raw: &str) -> Result<AlarmStatus, DbError> {
    match raw {
        "active" => Ok(AlarmStatus::Active),
        "acknowledged" => Ok(AlarmStatus::Acknowledged),
        "cleared" => Ok(AlarmStatus::Cleared),
        other => Err(DbError::Mapping(format!("unknown alarm status '{other}'"))),
    }
}

fn to_utc(ts: i64) -> Result<DateTime<Utc>, DbError> {
    Utc.timestamp_opt(ts, 0).single().ok_or_else(|| DbError::Mapping("invalid timestamp".into()))
}

#[instrument(skip(conn))]
pub async fn load_enabled_rules(conn: &Connection, tenant_id: &str, station_id: &str) -> Result<Vec<AlarmRule>, DbError> {
    let mut rows = conn
        .query(
            "SELECT rule_id, semantic, operator, threshold, hysteresis, duration_seconds, severity FROM alarm_rules WHERE tenant_id = ?1 AND station_id = ?2 AND enabled = 1",
            params![tenant_id.to_string(), station_id.to_string()],
        )
        .await
        .map_err(DbError::Query)?;

    let mut rules = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        let semantic_raw: String = row.get(1).map_err(DbError::Query)?;
        rules.push(AlarmRule {
            tenant_id: tenant_id.to_string(),
            station_id: station_id.to_string(),
            rule_id: row.get(0).map_err(DbError::Query)?,
            semantic: Semantic::from_str(&semantic_raw).ok_or_else(|| DbError::Mapping(format!("unknown semantic '{semantic_raw}'")))?,
            operator: operator_from_str(&row.get::<String>(2).map_err(DbError::Query)?)?,
            threshold: row.get(3).map_err(DbError::Query)?,
            hysteresis: row.get(4).map_err(DbError::Query)?,
            duration_seconds: row.get(5).map_err(DbError::Query)?,
            severity: severity_from_str(&row.get::<String>(6).map_err(DbError::Query)?)?,
            enabled: true,
        });
    }
    Ok(rules)
}

#[instrument(skip(conn))]
pub async fn find_open_alarm(conn: &Connection, tenant_id: &str, rule_id: &str, originator_id: &str) -> Result<Option<Alarm>, DbError> {
    let mut rows = conn
        .query(
            r#"
            SELECT id, originator_type, severity, status, start_at, end_at, last_value, acked_at, cleared_at
            FROM alarms
            WHERE tenant_id = ?1 AND rule_id = ?2 AND originator_id = ?3 AND status != 'cleared'
            ORDER BY start_at DESC LIMIT 1
            "#,
            params![tenant_id.to_string(), rule_id.to_string(), originator_id.to_string()],
        )
        .await
        .map_err(DbError::Query)?;

    let Some(row) = rows.next().await.map_err(DbError::Query)? else {
        return Ok(None);
    };

    let start_at: i64 = row.get(4).map_err(DbError::Query)?;
    let end_at: Option<i64> = row.get(5).map_err(DbError::Query)?;
    let acked_at: Option<i64> = row.get(7).map_err(DbError::Query)?;
    let cleared_at: Option<i64> = row.get(8).map_err(DbError::Query)?;

    Ok(Some(Alarm {
        id: row.get(0).map_err(DbError::Query)?,
        tenant_id: tenant_id.to_string(),
        rule_id: rule_id.to_string(),
        originator_type: originator_from_str(&row.get::<String>(1).map_err(DbError::Query)?)?,
        originator_id: originator_id.to_string(),
        severity: severity_from_str(&row.get::<String>(2).map_err(DbError::Query)?)?,
        status: alarm_status_from_str(&row.get::<String>(3).map_err(DbError::Query)?)?,
        start_at: to_utc(start_at)?,
        end_at: end_at.map(to_utc).transpose()?,
        last_value: row.get(6).map_err(DbError::Query)?,
        acked_at: acked_at.map(to_utc).transpose()?,
        cleared_at: cleared_at.map(to_utc).transpose()?,
    }))
}

#[instrument(skip(conn, alarm))]
pub async fn upsert_alarm(conn: &Connection, alarm: &Alarm) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO alarms (id, tenant_id, rule_id, originator_type, originator_id, severity, status, start_at, end_at, last_value, acked_at, cleared_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT (id) DO UPDATE SET
            severity = excluded.severity, status = excluded.status, end_at = excluded.end_at,
            last_value = excluded.last_value, acked_at = excluded.acked_at, cleared_at = excluded.cleared_at
        "#,
        params![
            alarm.id.clone(),
            alarm.tenant_id.clone(),
            alarm.rule_id.clone(),
            originator_str(alarm.originator_type).to_string(),
            alarm.originator_id.clone(),
            severity_str(alarm.severity).to_string(),
            alarm_status_str(alarm.status).to_string(),
            alarm.start_at.timestamp(),
            alarm.end_at.map(|ts| ts.timestamp()),
            alarm.last_value,
            alarm.acked_at.map(|ts| ts.timestamp()),
            alarm.cleared_at.map(|ts| ts.timestamp())
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

#[instrument(skip(conn))]
pub async fn load_rule_state(conn: &Connection, tenant_id: &str, rule_id: &str, originator_id: &str) -> Result<Option<RuleState>, DbError> {
    let mut rows = conn
        .query(
            "SELECT originator_type, pending_since, last_value FROM rule_states WHERE tenant_id = ?1 AND rule_id = ?2 AND originator_id = ?3",
            params![tenant_id.to_string(), rule_id.to_string(), originator_id.to_string()],
        )
        .await
        .map_err(DbError::Query)?;

    let Some(row) = rows.next().await.map_err(DbError::Query)? else {
        return Ok(None);
    };
    let pending_since: i64 = row.get(1).map_err(DbError::Query)?;
    Ok(Some(RuleState {
        tenant_id: tenant_id.to_string(),
        rule_id: rule_id.to_string(),
        originator_type: originator_from_str(&row.get::<String>(0).map_err(DbError::Query)?)?,
        originator_id: originator_id.to_string(),
        pending_since: to_utc(pending_since)?,
        last_value: row.get(2).map_err(DbError::Query)?,
    }))
}

#[instrument(skip(conn, state))]
pub async fn upsert_rule_state(conn: &Connection, state: &RuleState) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO rule_states (tenant_id, rule_id, originator_type, originator_id, pending_since, last_value)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (tenant_id, rule_id, originator_type, originator_id) DO UPDATE SET
            pending_since = excluded.pending_since, last_value = excluded.last_value
        "#,
        params![
            state.tenant_id.clone(),
            state.rule_id.clone(),
            originator_str(state.originator_type).to_string(),
            state.originator_id.clone(),
            state.pending_since.timestamp(),
            state.last_value
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

/// Every alarm still in the Active status, across all tenants, for the
/// escalation timer to re-check each tick.
#[instrument(skip(conn))]
pub async fn list_active(conn: &Connection) -> Result<Vec<Alarm>, DbError> {
    let mut rows = conn
        .query(
            r#"
            SELECT id, tenant_id, rule_id, originator_type, originator_id, severity, start_at, end_at, last_value, acked_at, cleared_at
            FROM alarms WHERE status = 'active'
            "#,
            (),
        )
        .await
        .map_err(DbError::Query)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        let start_at: i64 = row.get(6).map_err(DbError::Query)?;
        let end_at: Option<i64> = row.get(7).map_err(DbError::Query)?;
        let acked_at: Option<i64> = row.get(9).map_err(DbError::Query)?;
        let cleared_at: Option<i64> = row.get(10).map_err(DbError::Query)?;
        out.push(Alarm {
            id: row.get(0).map_err(DbError::Query)?,
            tenant_id: row.get(1).map_err(DbError::Query)?,
            rule_id: row.get(2).map_err(DbError::Query)?,
            originator_type: originator_from_str(&row.get::<String>(3).map_err(DbError::Query)?)?,
            originator_id: row.get(4).map_err(DbError::Query)?,
            severity: severity_from_str(&row.get::<String>(5).map_err(DbError::Query)?)?,
            status: AlarmStatus::Active,
            start_at: to_utc(start_at)?,
            end_at: end_at.map(to_utc).transpose()?,
            last_value: row.get(8).map_err(DbError::Query)?,
            acked_at: acked_at.map(to_utc).transpose()?,
            cleared_at: cleared_at.map(to_utc).transpose()?,
        });
    }
    Ok(out)
}

#[instrument(skip(conn))]
pub async fn clear_rule_state(conn: &Connection, tenant_id: &str, rule_id: &str, originator_id: &str) -> Result<(), DbError> {
    conn.execute(
        "DELETE FROM rule_states WHERE tenant_id = ?1 AND rule_id = ?2 AND originator_id = ?3",
        params![tenant_id.to_string(), rule_id.to_string(), originator_id.to_string()],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}
