// [apps/orchestrator/src/config.rs]
//! Runtime configuration, read once at startup from the process
//! environment (`.env` hydrated via `dotenvy` in `main`). Nothing under
//! `gridforge-orchestrator` reaches for `std::env::var` outside this file.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub turso_auth_token: Option<String>,

    pub device_gateway_base_url: String,
    pub device_gateway_timeout: Duration,
    pub alarm_webhook_url: String,
    pub alarm_webhook_timeout: Duration,
    pub shadowrun_webhook_url: String,
    pub shadowrun_webhook_timeout: Duration,

    pub outbox_batch_size: i64,
    pub outbox_poll_interval: Duration,

    pub idempotency_window: chrono::Duration,
    pub command_timeout: chrono::Duration,
    pub command_sweep_interval: Duration,

    pub scheduler_tick_interval: Duration,
    pub shadowrun_poll_interval: Duration,

    pub alarm_escalation_delay: chrono::Duration,
    pub alarm_cooldown: chrono::Duration,
    pub alarm_dedupe_window: chrono::Duration,
    pub alarm_escalation_check_interval: Duration,

    pub mapping_cache_ttl: Duration,
    pub emit_on_settlement_recalculate: bool,
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Loads configuration from the environment. Panics only on the one
    /// value with no sane default: `DATABASE_URL`.
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        Config {
            database_url,
            turso_auth_token: env::var("TURSO_AUTH_TOKEN").ok(),

            device_gateway_base_url: env::var("DEVICE_GATEWAY_URL").unwrap_or_else(|_| "http://localhost:8081".to_string()),
            device_gateway_timeout: Duration::from_secs(env_u64("DEVICE_GATEWAY_TIMEOUT_SECS", 10)),
            alarm_webhook_url: env::var("ALARM_WEBHOOK_URL").unwrap_or_else(|_| "http://localhost:8082/alarms".to_string()),
            alarm_webhook_timeout: Duration::from_secs(env_u64("ALARM_WEBHOOK_TIMEOUT_SECS", 10)),
            shadowrun_webhook_url: env::var("SHADOWRUN_WEBHOOK_URL").unwrap_or_else(|_| "http://localhost:8082/shadowruns".to_string()),
            shadowrun_webhook_timeout: Duration::from_secs(env_u64("SHADOWRUN_WEBHOOK_TIMEOUT_SECS", 10)),

            outbox_batch_size: env_i64("OUTBOX_BATCH_SIZE", 200),
            outbox_poll_interval: Duration::from_millis(env_u64("OUTBOX_POLL_INTERVAL_MS", 200)),

            idempotency_window: chrono::Duration::seconds(env_i64("COMMAND_IDEMPOTENCY_WINDOW_SECS", 300)),
            command_timeout: chrono::Duration::seconds(env_i64("COMMAND_TIMEOUT_SECS", 120)),
            command_sweep_interval: Duration::from_secs(env_u64("COMMAND_SWEEP_INTERVAL_SECS", 30)),

            scheduler_tick_interval: Duration::from_secs(env_u64("SCHEDULER_TICK_INTERVAL_SECS", 60)),
            shadowrun_poll_interval: Duration::from_secs(env_u64("SHADOWRUN_POLL_INTERVAL_SECS", 3600)),

            alarm_escalation_delay: chrono::Duration::seconds(env_i64("ALARM_ESCALATION_DELAY_SECS", 300)),
            alarm_cooldown: chrono::Duration::seconds(env_i64("ALARM_COOLDOWN_SECS", 600)),
            alarm_dedupe_window: chrono::Duration::seconds(env_i64("ALARM_DEDUPE_WINDOW_SECS", 60)),
            alarm_escalation_check_interval: Duration::from_secs(env_u64("ALARM_ESCALATION_CHECK_INTERVAL_SECS", 30)),

            mapping_cache_ttl: Duration::from_secs(env_u64("MAPPING_CACHE_TTL_SECS", 60)),
            emit_on_settlement_recalculate: env_bool("EMIT_ON_SETTLEMENT_RECALCULATE", false),
        }
    }
}
