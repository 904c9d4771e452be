// [libs/infra/db/src/repositories/settlement.rs]
use chrono::{DateTime, TimeZone, Utc};
use gridforge_domain_settlement::{
    DaySettlement, SettlementStatus, Statement, StatementItem, StatementStatus, TariffPlan, TariffRule,
};
use libsql::{params, Connection};
use tracing::instrument;

use crate::errors::DbError;

fn settlement_status_str(status: SettlementStatus) -> &'static str {
    match status {
        SettlementStatus::Draft => "draft",
        SettlementStatus::Calculated => "calculated",
    }
}

fn settlement_status_from_str(raw: &str) -> SettlementStatus {
    match raw {
        "calculated" => SettlementStatus::Calculated,
        _ => SettlementStatus::Draft,
    }
}

fn statement_status_str(status: StatementStatus) -> &'static str {
    match status {
        StatementStatus::Draft => "draft",
        StatementStatus::Frozen => "frozen",
        StatementStatus::Voided => "voided",
    }
}

fn statement_status_from_str(raw: &str) -> StatementStatus {
    match raw {
        "frozen" => StatementStatus::Frozen,
        "voided" => StatementStatus::Voided,
        _ => StatementStatus::Draft,
    }
}

fn to_utc(ts: i64) -> Result<DateTime<Utc>, DbError> {
    Utc.timestamp_opt(ts, 0).single().ok_or_else(|| DbError::Mapping("invalid timestamp".into()))
}

#[instrument(skip(conn))]
pub async fn load_day_settlement(conn: &Connection, tenant_id: &str, station_id: &str, day_start: DateTime<Utc>) -> Result<Option<DaySettlement>, DbError> {
    let mut rows = conn
        .query(
            "SELECT energy_kwh, amount, currency, status, version FROM day_settlements WHERE tenant_id = ?1 AND station_id = ?2 AND day_start = ?3",
            params![tenant_id.to_string(), station_id.to_string(), day_start.timestamp()],
        )
        .await
        .map_err(DbError::Query)?;

    let Some(row) = rows.next().await.map_err(DbError::Query)? else {
        return Ok(None);
    };
    Ok(Some(DaySettlement {
        tenant_id: tenant_id.to_string(),
        station_id: station_id.to_string(),
        day_start,
        energy_kwh: row.get(0).map_err(DbError::Query)?,
        amount: row.get(1).map_err(DbError::Query)?,
        currency: row.get(2).map_err(DbError::Query)?,
        status: settlement_status_from_str(&row.get::<String>(3).map_err(DbError::Query)?),
        version: row.get::<i64>(4).map_err(DbError::Query)? as u32,
    }))
}

#[instrument(skip(conn, settlement))]
pub async fn upsert_day_settlement(conn: &Connection, settlement: &DaySettlement) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO day_settlements (tenant_id, station_id, day_start, energy_kwh, amount, currency, status, version)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT (tenant_id, station_id, day_start) DO UPDATE SET
            energy_kwh = excluded.energy_kwh, amount = excluded.amount, currency = excluded.currency,
            status = excluded.status, version = excluded.version
        "#,
        params![
            settlement.tenant_id.clone(),
            settlement.station_id.clone(),
            settlement.day_start.timestamp(),
            settlement.energy_kwh,
            settlement.amount,
            settlement.currency.clone(),
            settlement_status_str(settlement.status).to_string(),
            settlement.version as i64
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

#[instrument(skip(conn))]
pub async fn load_day_settlements_for_month(conn: &Connection, tenant_id: &str, station_id: &str, month_start: DateTime<Utc>, month_end: DateTime<Utc>) -> Result<Vec<DaySettlement>, DbError> {
    let mut rows = conn
        .query(
            r#"
            SELECT day_start, energy_kwh, amount, currency, status, version
            FROM day_settlements
            WHERE tenant_id = ?1 AND station_id = ?2 AND day_start >= ?3 AND day_start < ?4
            ORDER BY day_start
            "#,
            params![tenant_id.to_string(), station_id.to_string(), month_start.timestamp(), month_end.timestamp()],
        )
        .await
        .map_err(DbError::Query)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        let day_start: i64 = row.get(0).map_err(DbError::Query)?;
        out.push(DaySettlement {
            tenant_id: tenant_id.to_string(),
            station_id: station_id.to_string(),
            day_start: to_utc(day_start)?,
            energy_kwh: row.get(1).map_err(DbError::Query)?,
            amount: row.get(2).map_err(DbError::Query)?,
            currency: row.get(3).map_err(DbError::Query)?,
            status: settlement_status_from_str(&row.get::<String>(4).map_err(DbError::Query)?),
            version: row.get::<i64>(5).map_err(DbError::Query)? as u32,
        });
    }
    Ok(out)
}

#[instrument(skip(conn))]
pub async fn load_tariff_plan(conn: &Connection, tenant_id: &str, station_id: &str, statement_month: DateTime<Utc>) -> Result<TariffPlan, DbError> {
    let mut rows = conn
        .query(
            "SELECT start_minute, end_minute, price_per_kwh, currency, fallback_price FROM tariff_rules WHERE tenant_id = ?1 AND station_id = ?2 AND statement_month = ?3 ORDER BY start_minute",
            params![tenant_id.to_string(), station_id.to_string(), statement_month.timestamp()],
        )
        .await
        .map_err(DbError::Query)?;

    let mut rules = Vec::new();
    let mut currency = String::new();
    let mut fallback_price = None;
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        let start_minute: i64 = row.get(0).map_err(DbError::Query)?;
        let end_minute: i64 = row.get(1).map_err(DbError::Query)?;
        let price_per_kwh: f64 = row.get(2).map_err(DbError::Query)?;
        currency = row.get(3).map_err(DbError::Query)?;
        fallback_price = row.get::<Option<f64>>(4).map_err(DbError::Query)?;
        rules.push(TariffRule {
            start_minute: start_minute as u32,
            end_minute: end_minute as u32,
            price_per_kwh,
        });
    }
    Ok(TariffPlan {
        currency,
        rules,
        fallback_price,
    })
}

/// Every (tenant, station) with a tariff plan configured for the month —
/// the population a shadow-run sweep enqueues jobs for, since a station
/// with nothing to price has nothing to reconcile.
#[instrument(skip(conn))]
pub async fn list_tariff_scopes_for_month(conn: &Connection, statement_month: DateTime<Utc>) -> Result<Vec<(String, String)>, DbError> {
    let mut rows = conn
        .query(
            "SELECT DISTINCT tenant_id, station_id FROM tariff_rules WHERE statement_month = ?1",
            params![statement_month.timestamp()],
        )
        .await
        .map_err(DbError::Query)?;

    let mut scopes = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        let tenant_id: String = row.get(0).map_err(DbError::Query)?;
        let station_id: String = row.get(1).map_err(DbError::Query)?;
        scopes.push((tenant_id, station_id));
    }
    Ok(scopes)
}

#[instrument(skip(conn, plan))]
pub async fn upsert_tariff_plan(conn: &Connection, tenant_id: &str, station_id: &str, statement_month: DateTime<Utc>, plan: &TariffPlan) -> Result<(), DbError> {
    let tx = conn.transaction().await.map_err(DbError::Query)?;
    tx.execute(
        "DELETE FROM tariff_rules WHERE tenant_id = ?1 AND station_id = ?2 AND statement_month = ?3",
        params![tenant_id.to_string(), station_id.to_string(), statement_month.timestamp()],
    )
    .await
    .map_err(DbError::Query)?;

    for rule in &plan.rules {
        tx.execute(
            r#"
            INSERT INTO tariff_rules (tenant_id, station_id, statement_month, start_minute, end_minute, price_per_kwh, currency, fallback_price)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                tenant_id.to_string(),
                station_id.to_string(),
                statement_month.timestamp(),
                rule.start_minute,
                rule.end_minute,
                rule.price_per_kwh,
                plan.currency.clone(),
                plan.fallback_price
            ],
        )
        .await
        .map_err(DbError::Query)?;
    }
    tx.commit().await.map_err(DbError::Query)?;
    Ok(())
}

#[instrument(skip(conn))]
pub async fn load_active_statement(conn: &Connection, tenant_id: &str, station_id: &str, statement_month: DateTime<Utc>, category: &str) -> Result<Option<Statement>, DbError> {
    let mut rows = conn
        .query(
            r#"
            SELECT version, status, total_energy_kwh, total_amount, currency, frozen_at, snapshot_hash, void_reason
            FROM statements
            WHERE tenant_id = ?1 AND station_id = ?2 AND statement_month = ?3 AND category = ?4 AND status != 'voided'
            ORDER BY version DESC LIMIT 1
            "#,
            params![tenant_id.to_string(), station_id.to_string(), statement_month.timestamp(), category.to_string()],
        )
        .await
        .map_err(DbError::Query)?;

    let Some(row) = rows.next().await.map_err(DbError::Query)? else {
        return Ok(None);
    };
    Ok(Some(row_to_statement(&row, tenant_id, station_id, statement_month, category)?))
}

fn row_to_statement(row: &libsql::Row, tenant_id: &str, station_id: &str, statement_month: DateTime<Utc>, category: &str) -> Result<Statement, DbError> {
    let version: i64 = row.get(0).map_err(DbError::Query)?;
    let status: String = row.get(1).map_err(DbError::Query)?;
    let total_energy_kwh: f64 = row.get(2).map_err(DbError::Query)?;
    let total_amount: f64 = row.get(3).map_err(DbError::Query)?;
    let currency: String = row.get(4).map_err(DbError::Query)?;
    let frozen_at: Option<i64> = row.get(5).map_err(DbError::Query)?;
    let snapshot_hash: Option<String> = row.get(6).map_err(DbError::Query)?;
    let void_reason: Option<String> = row.get(7).map_err(DbError::Query)?;

    Ok(Statement {
        tenant_id: tenant_id.to_string(),
        station_id: station_id.to_string(),
        statement_month,
        category: category.to_string(),
        version: version as u32,
        status: statement_status_from_str(&status),
        total_energy_kwh,
        total_amount,
        currency,
        frozen_at: frozen_at.map(to_utc).transpose()?,
        snapshot_hash,
        void_reason,
    })
}

#[instrument(skip(conn, statement, items))]
pub async fn insert_statement(conn: &Connection, statement: &Statement, items: &[StatementItem]) -> Result<(), DbError> {
    let tx = conn.transaction().await.map_err(DbError::Query)?;
    tx.execute(
        r#"
        INSERT INTO statements
            (tenant_id, station_id, statement_month, category, version, status, total_energy_kwh, total_amount, currency, frozen_at, snapshot_hash, void_reason)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            statement.tenant_id.clone(),
            statement.station_id.clone(),
            statement.statement_month.timestamp(),
            statement.category.clone(),
            statement.version as i64,
            statement_status_str(statement.status).to_string(),
            statement.total_energy_kwh,
            statement.total_amount,
            statement.currency.clone(),
            statement.frozen_at.map(|ts| ts.timestamp()),
            statement.snapshot_hash.clone(),
            statement.void_reason.clone()
        ],
    )
    .await
    .map_err(DbError::Query)?;

    for item in items {
        tx.execute(
            r#"
            INSERT INTO statement_items (tenant_id, station_id, statement_month, category, version, day_start, energy_kwh, amount, currency)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                statement.tenant_id.clone(),
                statement.station_id.clone(),
                statement.statement_month.timestamp(),
                statement.category.clone(),
                statement.version as i64,
                item.day_start.timestamp(),
                item.energy_kwh,
                item.amount,
                item.currency.clone()
            ],
        )
        .await
        .map_err(DbError::Query)?;
    }
    tx.commit().await.map_err(DbError::Query)?;
    Ok(())
}

#[instrument(skip(conn))]
pub async fn load_statement_items(conn: &Connection, tenant_id: &str, station_id: &str, statement_month: DateTime<Utc>, category: &str, version: u32) -> Result<Vec<StatementItem>, DbError> {
    let mut rows = conn
        .query(
            r#"
            SELECT day_start, energy_kwh, amount, currency FROM statement_items
            WHERE tenant_id = ?1 AND station_id = ?2 AND statement_month = ?3 AND category = ?4 AND version = ?5
            ORDER BY day_start
            "#,
            params![tenant_id.to_string(), station_id.to_string(), statement_month.timestamp(), category.to_string(), version as i64],
        )
        .await
        .map_err(DbError::Query)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        let day_start: i64 = row.get(0).map_err(DbError::Query)?;
        out.push(StatementItem {
            day_start: to_utc(day_start)?,
            energy_kwh: row.get(1).map_err(DbError::Query)?,
            amount: row.get(2).map_err(DbError::Query)?,
            currency: row.get(3).map_err(DbError::Query)?,
        });
    }
    Ok(out)
}

#[instrument(skip(conn, statement))]
pub async fn update_statement_status(conn: &Connection, statement: &Statement) -> Result<(), DbError> {
    conn.execute(
        r#"
        UPDATE statements SET status = ?6, frozen_at = ?7, snapshot_hash = ?8, void_reason = ?9
        WHERE tenant_id = ?1 AND station_id = ?2 AND statement_month = ?3 AND category = ?4 AND version = ?5
        "#,
        params![
            statement.tenant_id.clone(),
            statement.station_id.clone(),
            statement.statement_month.timestamp(),
            statement.category.clone(),
            statement.version as i64,
            statement_status_str(statement.status).to_string(),
            statement.frozen_at.map(|ts| ts.timestamp()),
            statement.snapshot_hash.clone(),
            statement.void_reason.clone()
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}
