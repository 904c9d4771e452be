// [libs/infra/gateway/src/alarm_notifier.rs]
//! Outbound notification for alarm state transitions and escalations
//! (spec.md §4.8 steps 6-7). Cooldown/dedupe suppression is decided in
//! `gridforge-domain-alarms::escalation` before a notifier is ever called;
//! this trait only models "deliver this one event somewhere".

use std::sync::Mutex;

use async_trait::async_trait;
use gridforge_domain_alarms::AlarmEvent;
use reqwest::Client;
use tracing::{instrument, warn};

use crate::errors::GatewayError;

#[async_trait]
pub trait AlarmNotifier: Send + Sync {
    async fn notify(&self, event: &AlarmEvent) -> Result<(), GatewayError>;
}

/// Production adapter: POSTs the alarm event to a configured webhook.
pub struct HttpAlarmNotifier {
    client: Client,
    webhook_url: String,
}

impl HttpAlarmNotifier {
    pub fn new(webhook_url: String, timeout: std::time::Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Network)?;
        Ok(Self { client, webhook_url })
    }
}

#[async_trait]
impl AlarmNotifier for HttpAlarmNotifier {
    #[instrument(skip(self, event))]
    async fn notify(&self, event: &AlarmEvent) -> Result<(), GatewayError> {
        let response = self.client.post(&self.webhook_url).json(event).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, alarm_id = %event.alarm.id, "alarm webhook rejected delivery");
            return Err(GatewayError::Rejected(format!("HTTP_{status}")));
        }
        Ok(())
    }
}

/// In-memory fake for tests: records every event it was asked to deliver.
pub struct FakeAlarmNotifier {
    delivered: Mutex<Vec<AlarmEvent>>,
}

impl FakeAlarmNotifier {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn delivered(&self) -> Vec<AlarmEvent> {
        self.delivered.lock().expect("fake notifier mutex poisoned").clone()
    }
}

impl Default for FakeAlarmNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlarmNotifier for FakeAlarmNotifier {
    async fn notify(&self, event: &AlarmEvent) -> Result<(), GatewayError> {
        self.delivered.lock().expect("fake notifier mutex poisoned").push(event.clone());
        Ok(())
    }
}
