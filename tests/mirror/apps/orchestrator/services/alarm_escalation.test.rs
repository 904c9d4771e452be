//! S4: a rule with no duration gate (`duration_seconds = 0`) transitions
//! straight from no-alarm to Active on the triggering sample, and clears
//! once a later sample crosses back under `threshold - hysteresis`.

#[path = "../support.rs"]
mod support;

use gridforge_domain_alarms::{AlarmEventType, AlarmStatus, OriginatorType};
use gridforge_domain_events::{PointSample, PointValue};
use gridforge_domain_telemetry::{PointMapping, Semantic};
use gridforge_infra_db::repositories::{alarms, mapping};
use gridforge_orchestrator::services::ingest::IngestService;
use gridforge_orchestrator::services::outbox_dispatcher::OutboxDispatcher;
use libsql::params;

const TENANT: &str = "t1";
const STATION: &str = "s1";
const DEVICE: &str = "d1";
const RULE_ID: &str = "over-charge";

async fn seed_rule(state: &gridforge_orchestrator::state::AppState) {
    let conn = state.db.connection().unwrap();
    mapping::upsert(
        &conn,
        &PointMapping {
            station_id: STATION.into(),
            device_id: None,
            point_key: "charge".into(),
            semantic: Semantic::ChargePowerKw,
            unit: "kW".into(),
            factor: 1.0,
        },
    )
    .await
    .unwrap();

    conn.execute(
        r#"
        INSERT INTO alarm_rules (tenant_id, station_id, rule_id, semantic, operator, threshold, hysteresis, duration_seconds, severity, enabled)
        VALUES (?1, ?2, ?3, 'charge_power_kw', 'gt', 100.0, 5.0, 0, 'high', 1)
        "#,
        params![TENANT.to_string(), STATION.to_string(), RULE_ID.to_string()],
    )
    .await
    .unwrap();
}

async fn ingest_sample(state: &gridforge_orchestrator::state::AppState, value: f64, ts: chrono::DateTime<chrono::Utc>) {
    IngestService::ingest(
        state,
        TENANT,
        STATION,
        DEVICE,
        vec![PointSample {
            point_key: "charge".into(),
            ts,
            value: PointValue::Numeric(value),
        }],
        ts,
    )
    .await
    .unwrap();
    let processed = OutboxDispatcher::tick(state).await.unwrap();
    assert_eq!(processed, 1);
}

#[tokio::test]
async fn sample_over_threshold_activates_then_a_later_sample_under_hysteresis_clears() {
    let now = support::fixed_point(2026, 3, 1, 0);
    let (state, _clock, fakes) = support::build_state(now, vec![]).await;
    seed_rule(&state).await;

    ingest_sample(&state, 120.0, now).await;

    let conn = state.db.connection().unwrap();
    let active = alarms::find_open_alarm(&conn, TENANT, RULE_ID, DEVICE).await.unwrap().expect("alarm is open");
    assert_eq!(active.status, AlarmStatus::Active);
    assert_eq!(active.last_value, 120.0);
    assert_eq!(active.originator_type, OriginatorType::Device);
    assert_eq!(active.originator_id, DEVICE);

    let delivered = fakes.alarm_notifier.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].event_type, AlarmEventType::Active);

    // 90 is below threshold - hysteresis (95), so the alarm clears.
    ingest_sample(&state, 90.0, now + chrono::Duration::minutes(1)).await;

    let cleared = alarms::find_open_alarm(&conn, TENANT, RULE_ID, DEVICE).await.unwrap();
    assert!(cleared.is_none(), "a cleared alarm is no longer open");

    let delivered = fakes.alarm_notifier.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[1].event_type, AlarmEventType::Cleared);
}

/// A sample that dips between threshold and `threshold - hysteresis` is
/// neither a new trigger nor a clear: the alarm just carries its last value.
#[tokio::test]
async fn sample_inside_the_hysteresis_band_neither_triggers_nor_clears() {
    let now = support::fixed_point(2026, 3, 1, 0);
    let (state, _clock, _fakes) = support::build_state(now, vec![]).await;
    seed_rule(&state).await;

    ingest_sample(&state, 120.0, now).await;
    ingest_sample(&state, 98.0, now + chrono::Duration::minutes(1)).await;

    let conn = state.db.connection().unwrap();
    let alarm = alarms::find_open_alarm(&conn, TENANT, RULE_ID, DEVICE).await.unwrap().expect("alarm stays open");
    assert_eq!(alarm.status, AlarmStatus::Active);
    assert_eq!(alarm.last_value, 98.0);
}
