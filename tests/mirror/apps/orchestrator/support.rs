//! Shared test scaffolding: hand-constructs an `AppState` the way
//! `AppState::connect` would, but swapping the HTTP-backed device/alarm
//! gateways for the in-memory fakes and `SystemClock` for `FixedClock` so
//! scenarios can pin and advance time deterministically. Every field on
//! `AppState`/`Config` is `pub` for exactly this reason.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use gridforge_core_clock::FixedClock;
use gridforge_domain_alarms::{CooldownTracker, DedupeTracker};
use gridforge_domain_events::registry::PayloadRegistry;
use gridforge_infra_db::repositories::mapping::MappingCache;
use gridforge_infra_db::DbClient;
use gridforge_infra_gateway::{FakeAlarmNotifier, FakeDeviceGatewayClient, FakeShadowRunNotifier};
use gridforge_orchestrator::config::Config;
use gridforge_orchestrator::event_bus::AlarmEventBus;
use gridforge_orchestrator::state::AppState;

pub fn fixed_point(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
}

fn test_config() -> Config {
    Config {
        database_url: ":memory:".to_string(),
        turso_auth_token: None,
        device_gateway_base_url: "http://unused.invalid".to_string(),
        device_gateway_timeout: Duration::from_secs(1),
        alarm_webhook_url: "http://unused.invalid".to_string(),
        alarm_webhook_timeout: Duration::from_secs(1),
        shadowrun_webhook_url: "http://unused.invalid".to_string(),
        shadowrun_webhook_timeout: Duration::from_secs(1),
        outbox_batch_size: 1000,
        outbox_poll_interval: Duration::from_millis(50),
        idempotency_window: chrono::Duration::seconds(300),
        command_timeout: chrono::Duration::seconds(120),
        command_sweep_interval: Duration::from_secs(30),
        scheduler_tick_interval: Duration::from_secs(60),
        shadowrun_poll_interval: Duration::from_secs(3600),
        alarm_escalation_delay: chrono::Duration::seconds(300),
        alarm_cooldown: chrono::Duration::seconds(600),
        alarm_dedupe_window: chrono::Duration::seconds(60),
        alarm_escalation_check_interval: Duration::from_secs(30),
        mapping_cache_ttl: Duration::from_millis(1),
        emit_on_settlement_recalculate: false,
    }
}

/// Handles to the fakes wired into a test `AppState`, kept separately from
/// the `Arc<dyn Trait>` fields on `AppState` itself so a scenario can still
/// inspect what was sent/delivered after the state has been passed around.
pub struct Fakes {
    pub device_client: Arc<FakeDeviceGatewayClient>,
    pub alarm_notifier: Arc<FakeAlarmNotifier>,
    pub shadowrun_notifier: Arc<FakeShadowRunNotifier>,
}

/// Builds a state over a fresh `:memory:` database, starting the fixed
/// clock at `start`. Caller owns the `FixedClock` handle to advance it.
pub async fn build_state(start: DateTime<Utc>, scripted_rpc_results: Vec<gridforge_domain_commands::RpcResult>) -> (AppState, FixedClock, Fakes) {
    let db = DbClient::connect(":memory:", None).await.expect("in-memory db connects");
    let clock = FixedClock::new(start);
    let config = test_config();
    let device_client = Arc::new(FakeDeviceGatewayClient::new(scripted_rpc_results));
    let alarm_notifier = Arc::new(FakeAlarmNotifier::new());
    let shadowrun_notifier = Arc::new(FakeShadowRunNotifier::new());

    let state = AppState {
        db,
        config: Arc::new(config.clone()),
        clock: Arc::new(clock.clone()),
        registry: Arc::new(PayloadRegistry::canonical()),
        mapping_cache: Arc::new(MappingCache::new(config.mapping_cache_ttl)),
        alarm_bus: Arc::new(AlarmEventBus::new()),
        device_client: device_client.clone(),
        alarm_notifier: alarm_notifier.clone(),
        shadowrun_notifier: shadowrun_notifier.clone(),
        alarm_cooldown: Arc::new(Mutex::new(CooldownTracker::new())),
        alarm_dedupe: Arc::new(Mutex::new(DedupeTracker::new())),
    };
    (
        state,
        clock,
        Fakes {
            device_client,
            alarm_notifier,
            shadowrun_notifier,
        },
    )
}

/// Drains the outbox until a tick processes nothing, bounding the loop so a
/// wiring bug that keeps generating rows fails the test instead of hanging.
pub async fn drain_outbox(state: &AppState) -> usize {
    let mut total = 0;
    for _ in 0..64 {
        let processed = gridforge_orchestrator::services::outbox_dispatcher::OutboxDispatcher::tick(state)
            .await
            .expect("outbox tick succeeds");
        total += processed;
        if processed == 0 {
            return total;
        }
    }
    panic!("outbox did not drain within 64 ticks");
}
