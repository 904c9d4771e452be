// [libs/core/clock/src/lib.rs]
//! Monotonic-UTC clock capability and the deterministic compound-id factory.
//!
//! The rest of the workspace never calls `Utc::now()` or `Uuid::new_v4()`
//! directly for anything that becomes part of a persisted identity; it goes
//! through [`Clock`] and [`Ids`] so tests can fix time and assert on stable
//! keys instead of racing the wall clock.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Capability for reading the current time, passed through construction
/// rather than reached for as a global singleton.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock: thin wrapper over `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for tests: starts at a fixed instant and only moves
/// when told to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    inner: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(at)),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.inner.lock().expect("FixedClock mutex poisoned");
        *guard += delta;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut guard = self.inner.lock().expect("FixedClock mutex poisoned");
        *guard = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.lock().expect("FixedClock mutex poisoned")
    }
}

/// Shared, cloneable handle to a clock implementation.
pub type SharedClock = Arc<dyn Clock>;

/// Deterministic compound-id factory: same logical fact always yields the
/// same key, built by joining identity fields with `:`.
pub struct Ids;

impl Ids {
    /// Primary key for a telemetry `Measurement` row.
    pub fn measurement_key(
        tenant_id: &str,
        station_id: &str,
        device_id: &str,
        point_key: &str,
        ts: DateTime<Utc>,
    ) -> String {
        format!(
            "{tenant_id}:{station_id}:{device_id}:{point_key}:{}",
            ts.timestamp()
        )
    }

    /// Identity for a `StatisticAggregate`: (subject_id, granularity, period_start).
    pub fn aggregate_id(subject_id: &str, granularity: &str, period_start: DateTime<Utc>) -> String {
        format!("{subject_id}:{granularity}:{}", period_start.timestamp())
    }

    /// Identity for a `DaySettlement`: (tenant_id, station_id, day_start).
    pub fn day_settlement_id(tenant_id: &str, station_id: &str, day_start: DateTime<Utc>) -> String {
        format!("{tenant_id}:{station_id}:{}", day_start.timestamp())
    }

    /// Identity for a `Statement`: (tenant_id, station_id, statement_month, category, version).
    pub fn statement_id(
        tenant_id: &str,
        station_id: &str,
        statement_month: &str,
        category: &str,
        version: u32,
    ) -> String {
        format!("{tenant_id}:{station_id}:{statement_month}:{category}:v{version}")
    }

    /// Identity for an `Alarm`: hash(tenant_id, rule_id, originator_id, start_at).
    pub fn alarm_id(tenant_id: &str, rule_id: &str, originator_id: &str, start_at: DateTime<Utc>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(tenant_id.as_bytes());
        hasher.update(b"|");
        hasher.update(rule_id.as_bytes());
        hasher.update(b"|");
        hasher.update(originator_id.as_bytes());
        hasher.update(b"|");
        hasher.update(start_at.timestamp().to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Identity for a `ShadowJob`/`ShadowReport`: (tenant, station, month, job_date, job_type).
    pub fn shadow_job_id(
        tenant_id: &str,
        station_id: &str,
        month: &str,
        job_date: chrono::NaiveDate,
        job_type: &str,
    ) -> String {
        format!("{tenant_id}:{station_id}:{month}:{job_date}:{job_type}")
    }

    /// Fresh `event_id` for a newly-emitted envelope.
    pub fn new_event_id() -> Uuid {
        Uuid::new_v4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_logical_fact_yields_same_key() {
        let ts = DateTime::parse_from_rfc3339("2026-01-20T06:00:00Z").unwrap().with_timezone(&Utc);
        let a = Ids::measurement_key("t1", "s1", "d1", "charge_power_kw", ts);
        let b = Ids::measurement_key("t1", "s1", "d1", "charge_power_kw", ts);
        assert_eq!(a, b);
    }

    #[test]
    fn alarm_id_is_stable_and_order_sensitive() {
        let ts = Utc::now();
        let a = Ids::alarm_id("t1", "rule1", "dev1", ts);
        let b = Ids::alarm_id("t1", "rule1", "dev1", ts);
        let c = Ids::alarm_id("t1", "rule2", "dev1", ts);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn fixed_clock_only_moves_when_told() {
        let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(chrono::Duration::hours(1));
        assert_eq!(clock.now(), start + chrono::Duration::hours(1));
    }
}
