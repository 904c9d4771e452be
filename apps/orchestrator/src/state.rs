// [apps/orchestrator/src/state.rs]
//! Shared application state, grounded on the teacher's `AppState`: one
//! cloneable handle threaded through every daemon and service call. Unlike
//! the teacher's state (mission/billing/gamification managers plus a
//! GraphQL schema) this holds only what the pipeline actually needs: the
//! database client, the outbound gateway traits, the alarm bus, and config.

use std::sync::{Arc, Mutex};

use gridforge_core_clock::{Clock, SystemClock};
use gridforge_domain_alarms::{CooldownTracker, DedupeTracker};
use gridforge_domain_events::registry::PayloadRegistry;
use gridforge_infra_db::repositories::mapping::MappingCache;
use gridforge_infra_db::DbClient;
use gridforge_infra_gateway::{AlarmNotifier, DeviceGatewayClient, HttpAlarmNotifier, HttpDeviceGatewayClient, HttpShadowRunNotifier, ShadowRunNotifier};

use crate::config::Config;
use crate::event_bus::AlarmEventBus;

#[derive(Clone)]
pub struct AppState {
    pub db: DbClient,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub registry: Arc<PayloadRegistry>,
    pub mapping_cache: Arc<MappingCache>,
    pub alarm_bus: Arc<AlarmEventBus>,
    pub device_client: Arc<dyn DeviceGatewayClient>,
    pub alarm_notifier: Arc<dyn AlarmNotifier>,
    pub shadowrun_notifier: Arc<dyn ShadowRunNotifier>,
    pub alarm_cooldown: Arc<Mutex<CooldownTracker>>,
    pub alarm_dedupe: Arc<Mutex<DedupeTracker>>,
}

impl AppState {
    pub async fn connect(config: Config) -> Result<Self, gridforge_infra_db::DbError> {
        let db = DbClient::connect(&config.database_url, config.turso_auth_token.clone()).await?;

        let device_client = HttpDeviceGatewayClient::new(config.device_gateway_base_url.clone(), config.device_gateway_timeout)
            .map_err(|e| gridforge_infra_db::DbError::Configuration(e.to_string()))?;
        let alarm_notifier = HttpAlarmNotifier::new(config.alarm_webhook_url.clone(), config.alarm_webhook_timeout)
            .map_err(|e| gridforge_infra_db::DbError::Configuration(e.to_string()))?;
        let shadowrun_notifier = HttpShadowRunNotifier::new(config.shadowrun_webhook_url.clone(), config.shadowrun_webhook_timeout)
            .map_err(|e| gridforge_infra_db::DbError::Configuration(e.to_string()))?;

        let mapping_cache = Arc::new(MappingCache::new(config.mapping_cache_ttl));

        Ok(AppState {
            db,
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
            registry: Arc::new(PayloadRegistry::canonical()),
            mapping_cache,
            alarm_bus: Arc::new(AlarmEventBus::new()),
            device_client: Arc::new(device_client),
            alarm_notifier: Arc::new(alarm_notifier),
            shadowrun_notifier: Arc::new(shadowrun_notifier),
            alarm_cooldown: Arc::new(Mutex::new(CooldownTracker::new())),
            alarm_dedupe: Arc::new(Mutex::new(DedupeTracker::new())),
        })
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}
