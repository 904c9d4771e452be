// [libs/infra/db/src/schema.rs]
//! Idempotent schema bootstrap, grounded on the teacher's
//! `apply_full_sovereign_schema`: a flat list of `CREATE TABLE IF NOT
//! EXISTS` statements applied in order, followed by indexes.

use libsql::Connection;
use tracing::{debug, instrument};

use crate::errors::DbError;

const TABLES: &[(&str, &str)] = &[
    (
        "measurements",
        r#"
        CREATE TABLE IF NOT EXISTS measurements (
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            device_id TEXT NOT NULL,
            point_key TEXT NOT NULL,
            ts INTEGER NOT NULL,
            value_numeric REAL,
            value_text TEXT,
            quality TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (tenant_id, station_id, device_id, point_key, ts)
        );
    "#,
    ),
    (
        "point_mappings",
        r#"
        CREATE TABLE IF NOT EXISTS point_mappings (
            station_id TEXT NOT NULL,
            device_id TEXT,
            point_key TEXT NOT NULL,
            semantic TEXT NOT NULL,
            unit TEXT NOT NULL,
            factor REAL NOT NULL,
            PRIMARY KEY (station_id, device_id, point_key)
        );
    "#,
    ),
    (
        "outbox",
        r#"
        CREATE TABLE IF NOT EXISTS outbox (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT NOT NULL UNIQUE,
            event_type TEXT NOT NULL,
            tenant_id TEXT NOT NULL,
            station_id TEXT,
            payload TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            claimed_by TEXT,
            attempts INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            sent_at INTEGER
        );
    "#,
    ),
    (
        "processed_events",
        r#"
        CREATE TABLE IF NOT EXISTS processed_events (
            event_id TEXT NOT NULL,
            consumer_name TEXT NOT NULL,
            processed_at INTEGER NOT NULL,
            PRIMARY KEY (event_id, consumer_name)
        );
    "#,
    ),
    (
        "dead_letters",
        r#"
        CREATE TABLE IF NOT EXISTS dead_letters (
            event_id TEXT PRIMARY KEY,
            event_type TEXT NOT NULL,
            payload TEXT NOT NULL,
            error TEXT NOT NULL,
            first_seen_at INTEGER NOT NULL,
            last_seen_at INTEGER NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 1
        );
    "#,
    ),
    (
        "statistic_aggregates",
        r#"
        CREATE TABLE IF NOT EXISTS statistic_aggregates (
            subject_id TEXT NOT NULL,
            granularity TEXT NOT NULL,
            period_start INTEGER NOT NULL,
            charge_kwh REAL NOT NULL,
            discharge_kwh REAL NOT NULL,
            earnings REAL NOT NULL,
            carbon_reduction REAL NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            completed_at INTEGER,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (subject_id, granularity, period_start)
        );
    "#,
    ),
    (
        "day_settlements",
        r#"
        CREATE TABLE IF NOT EXISTS day_settlements (
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            day_start INTEGER NOT NULL,
            energy_kwh REAL NOT NULL,
            amount REAL NOT NULL,
            currency TEXT NOT NULL,
            status TEXT NOT NULL,
            version INTEGER NOT NULL,
            PRIMARY KEY (tenant_id, station_id, day_start)
        );
    "#,
    ),
    (
        "statements",
        r#"
        CREATE TABLE IF NOT EXISTS statements (
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            statement_month INTEGER NOT NULL,
            category TEXT NOT NULL,
            version INTEGER NOT NULL,
            status TEXT NOT NULL,
            total_energy_kwh REAL NOT NULL,
            total_amount REAL NOT NULL,
            currency TEXT NOT NULL,
            frozen_at INTEGER,
            snapshot_hash TEXT,
            void_reason TEXT,
            PRIMARY KEY (tenant_id, station_id, statement_month, category, version)
        );
    "#,
    ),
    (
        "statement_items",
        r#"
        CREATE TABLE IF NOT EXISTS statement_items (
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            statement_month INTEGER NOT NULL,
            category TEXT NOT NULL,
            version INTEGER NOT NULL,
            day_start INTEGER NOT NULL,
            energy_kwh REAL NOT NULL,
            amount REAL NOT NULL,
            currency TEXT NOT NULL,
            PRIMARY KEY (tenant_id, station_id, statement_month, category, version, day_start)
        );
    "#,
    ),
    (
        "tariff_rules",
        r#"
        CREATE TABLE IF NOT EXISTS tariff_rules (
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            statement_month INTEGER NOT NULL,
            start_minute INTEGER NOT NULL,
            end_minute INTEGER NOT NULL,
            price_per_kwh REAL NOT NULL,
            currency TEXT NOT NULL,
            fallback_price REAL,
            PRIMARY KEY (tenant_id, station_id, statement_month, start_minute)
        );
    "#,
    ),
    (
        "alarm_rules",
        r#"
        CREATE TABLE IF NOT EXISTS alarm_rules (
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            rule_id TEXT NOT NULL,
            semantic TEXT NOT NULL,
            operator TEXT NOT NULL,
            threshold REAL NOT NULL,
            hysteresis REAL NOT NULL,
            duration_seconds INTEGER NOT NULL,
            severity TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (tenant_id, station_id, rule_id)
        );
    "#,
    ),
    (
        "alarms",
        r#"
        CREATE TABLE IF NOT EXISTS alarms (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            rule_id TEXT NOT NULL,
            originator_type TEXT NOT NULL,
            originator_id TEXT NOT NULL,
            severity TEXT NOT NULL,
            status TEXT NOT NULL,
            start_at INTEGER NOT NULL,
            end_at INTEGER,
            last_value REAL NOT NULL,
            acked_at INTEGER,
            cleared_at INTEGER
        );
    "#,
    ),
    (
        "rule_states",
        r#"
        CREATE TABLE IF NOT EXISTS rule_states (
            tenant_id TEXT NOT NULL,
            rule_id TEXT NOT NULL,
            originator_type TEXT NOT NULL,
            originator_id TEXT NOT NULL,
            pending_since INTEGER NOT NULL,
            last_value REAL NOT NULL,
            PRIMARY KEY (tenant_id, rule_id, originator_type, originator_id)
        );
    "#,
    ),
    (
        "commands",
        r#"
        CREATE TABLE IF NOT EXISTS commands (
            command_id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            device_id TEXT NOT NULL,
            command_type TEXT NOT NULL,
            payload TEXT NOT NULL,
            idempotency_key TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            sent_at INTEGER,
            acked_at INTEGER,
            error TEXT
        );
    "#,
    ),
    (
        "idx_commands_idempotency",
        "CREATE INDEX IF NOT EXISTS idx_commands_idempotency ON commands(tenant_id, idempotency_key, created_at);",
    ),
    (
        "strategies",
        r#"
        CREATE TABLE IF NOT EXISTS strategies (
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            mode TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            template_type TEXT NOT NULL,
            threshold_kw REAL NOT NULL,
            min_kw REAL NOT NULL,
            max_kw REAL NOT NULL,
            PRIMARY KEY (tenant_id, station_id)
        );
    "#,
    ),
    (
        "calendar_windows",
        r#"
        CREATE TABLE IF NOT EXISTS calendar_windows (
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            window_date TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            PRIMARY KEY (tenant_id, station_id, window_date)
        );
    "#,
    ),
    (
        "shadow_jobs",
        r#"
        CREATE TABLE IF NOT EXISTS shadow_jobs (
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            statement_month INTEGER NOT NULL,
            job_date TEXT NOT NULL,
            job_type TEXT NOT NULL,
            status TEXT NOT NULL,
            error TEXT,
            PRIMARY KEY (tenant_id, station_id, statement_month, job_date, job_type)
        );
    "#,
    ),
    (
        "shadow_reports",
        r#"
        CREATE TABLE IF NOT EXISTS shadow_reports (
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            statement_month INTEGER NOT NULL,
            diff_energy_max REAL NOT NULL,
            diff_amount_max REAL NOT NULL,
            missing_hours_total INTEGER NOT NULL,
            recommended_action TEXT NOT NULL,
            archive_path TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (tenant_id, station_id, statement_month, created_at)
        );
    "#,
    ),
    (
        "shadow_alerts",
        r#"
        CREATE TABLE IF NOT EXISTS shadow_alerts (
            tenant_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            statement_month INTEGER NOT NULL,
            recommended_action TEXT NOT NULL,
            raised_at INTEGER NOT NULL,
            PRIMARY KEY (tenant_id, station_id, statement_month, raised_at)
        );
    "#,
    ),
    (
        "idx_outbox_pending",
        "CREATE INDEX IF NOT EXISTS idx_outbox_pending ON outbox(status, created_at, id);",
    ),
    (
        "idx_alarms_open",
        "CREATE INDEX IF NOT EXISTS idx_alarms_open ON alarms(tenant_id, rule_id, originator_id, status);",
    ),
];

#[instrument(skip(conn))]
pub async fn apply_schema(conn: &Connection) -> Result<(), DbError> {
    for (name, sql) in TABLES {
        debug!(table = *name, "applying schema statement");
        conn.execute(sql, ()).await.map_err(DbError::Query)?;
    }
    Ok(())
}
