// [libs/infra/gateway/src/shadowrun_notifier.rs]
//! Outbound notification for a shadow-run threshold breach (spec.md §4.11
//! step 7: "insert a ShadowAlert and notify"). Same shape as
//! `AlarmNotifier`: a thin trait the orchestrator calls, a production HTTP
//! adapter, and a fake that records what it was asked to deliver.

use std::sync::Mutex;

use async_trait::async_trait;
use gridforge_domain_shadowrun::ShadowAlert;
use reqwest::Client;
use tracing::{instrument, warn};

use crate::errors::GatewayError;

#[async_trait]
pub trait ShadowRunNotifier: Send + Sync {
    async fn notify(&self, alert: &ShadowAlert) -> Result<(), GatewayError>;
}

/// Production adapter: POSTs the breach alert to a configured webhook.
pub struct HttpShadowRunNotifier {
    client: Client,
    webhook_url: String,
}

impl HttpShadowRunNotifier {
    pub fn new(webhook_url: String, timeout: std::time::Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Network)?;
        Ok(Self { client, webhook_url })
    }
}

#[async_trait]
impl ShadowRunNotifier for HttpShadowRunNotifier {
    #[instrument(skip(self, alert))]
    async fn notify(&self, alert: &ShadowAlert) -> Result<(), GatewayError> {
        let response = self.client.post(&self.webhook_url).json(alert).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, tenant_id = %alert.tenant_id, station_id = %alert.station_id, "shadow run webhook rejected delivery");
            return Err(GatewayError::Rejected(format!("HTTP_{status}")));
        }
        Ok(())
    }
}

/// In-memory fake for tests: records every alert it was asked to deliver.
pub struct FakeShadowRunNotifier {
    delivered: Mutex<Vec<ShadowAlert>>,
}

impl FakeShadowRunNotifier {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn delivered(&self) -> Vec<ShadowAlert> {
        self.delivered.lock().expect("fake notifier mutex poisoned").clone()
    }
}

impl Default for FakeShadowRunNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShadowRunNotifier for FakeShadowRunNotifier {
    async fn notify(&self, alert: &ShadowAlert) -> Result<(), GatewayError> {
        self.delivered.lock().expect("fake notifier mutex poisoned").push(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gridforge_domain_shadowrun::RecommendedAction;

    fn alert() -> ShadowAlert {
        ShadowAlert {
            tenant_id: "t1".into(),
            station_id: "s1".into(),
            month: Utc::now(),
            recommended_action: RecommendedAction::CheckTariffOrSettlement,
            raised_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fake_records_delivered_alerts() {
        let fake = FakeShadowRunNotifier::new();
        fake.notify(&alert()).await.unwrap();
        assert_eq!(fake.delivered().len(), 1);
    }
}
