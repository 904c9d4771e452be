// [libs/infra/gateway/src/device_client.rs]
//! RPC boundary to the physical device fleet (spec.md §4.9 step 3): issuing
//! a `Command` means calling out to whatever actually owns the device. The
//! trait keeps the command lifecycle state machine in `gridforge-domain-commands`
//! free of any transport concern; a fake implementation drives it in tests.

use std::sync::Mutex;

use async_trait::async_trait;
use gridforge_domain_commands::{Command, RpcResult};
use reqwest::Client;
use tracing::{info, instrument, warn};

use crate::errors::GatewayError;

#[async_trait]
pub trait DeviceGatewayClient: Send + Sync {
    async fn send_command(&self, command: &Command) -> Result<RpcResult, GatewayError>;
}

/// Production adapter: POSTs the command to the device gateway's REST API
/// and maps its response onto the domain's closed `RpcResult` set.
pub struct HttpDeviceGatewayClient {
    client: Client,
    base_url: String,
}

impl HttpDeviceGatewayClient {
    pub fn new(base_url: String, timeout: std::time::Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Network)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DeviceGatewayClient for HttpDeviceGatewayClient {
    #[instrument(skip(self, command))]
    async fn send_command(&self, command: &Command) -> Result<RpcResult, GatewayError> {
        let url = format!("{}/api/v1/devices/{}/commands", self.base_url, command.device_id);
        let response = self.client.post(&url).json(command).send().await?;

        if response.status().is_success() {
            let body: serde_json::Value = response.json().await?;
            match body.get("status").and_then(|v| v.as_str()) {
                Some("acked") => Ok(RpcResult::Acked),
                Some("sent") | None => Ok(RpcResult::Sent),
                Some(other) => Ok(RpcResult::Failed(other.to_string())),
            }
        } else {
            let status = response.status();
            warn!(%status, device_id = %command.device_id, "device gateway rejected command");
            Ok(RpcResult::Failed(format!("HTTP_{status}")))
        }
    }
}

/// In-memory fake for tests: replays a scripted sequence of results and
/// records every command it was asked to send.
pub struct FakeDeviceGatewayClient {
    scripted: Mutex<Vec<RpcResult>>,
    sent: Mutex<Vec<Command>>,
}

impl FakeDeviceGatewayClient {
    pub fn new(scripted: Vec<RpcResult>) -> Self {
        Self {
            scripted: Mutex::new(scripted),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent_commands(&self) -> Vec<Command> {
        self.sent.lock().expect("fake gateway mutex poisoned").clone()
    }
}

#[async_trait]
impl DeviceGatewayClient for FakeDeviceGatewayClient {
    async fn send_command(&self, command: &Command) -> Result<RpcResult, GatewayError> {
        self.sent.lock().expect("fake gateway mutex poisoned").push(command.clone());
        let mut scripted = self.scripted.lock().expect("fake gateway mutex poisoned");
        if scripted.is_empty() {
            info!(command_id = %command.command_id, "fake gateway has no scripted result left, defaulting to Sent");
            return Ok(RpcResult::Sent);
        }
        Ok(scripted.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gridforge_domain_commands::CommandStatus;
    use serde_json::json;

    fn command() -> Command {
        Command {
            command_id: "c1".into(),
            tenant_id: "t1".into(),
            station_id: "s1".into(),
            device_id: "d1".into(),
            command_type: "setpoint".into(),
            payload: json!({"target_kw": 10.0}),
            idempotency_key: "k1".into(),
            status: CommandStatus::Sent,
            created_at: Utc::now(),
            sent_at: Some(Utc::now()),
            acked_at: None,
            error: None,
        }
    }

    #[tokio::test]
    async fn fake_replays_scripted_results_in_order() {
        let fake = FakeDeviceGatewayClient::new(vec![RpcResult::Acked, RpcResult::Failed("busy".into())]);
        assert_eq!(fake.send_command(&command()).await.unwrap(), RpcResult::Acked);
        assert_eq!(fake.send_command(&command()).await.unwrap(), RpcResult::Failed("busy".into()));
        assert_eq!(fake.sent_commands().len(), 2);
    }
}
