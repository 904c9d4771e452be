// [libs/infra/gateway/src/lib.rs]
//! Outbound integration points the orchestrator calls through traits:
//! the device-gateway RPC client (C9), the alarm notifier (C8), and the
//! shadow-run breach notifier (C11). Production adapters speak HTTP via
//! `reqwest`; fakes drive the same trait surface from tests.

mod alarm_notifier;
mod device_client;
mod errors;
mod shadowrun_notifier;

pub use alarm_notifier::{AlarmNotifier, FakeAlarmNotifier, HttpAlarmNotifier};
pub use device_client::{DeviceGatewayClient, FakeDeviceGatewayClient, HttpDeviceGatewayClient};
pub use errors::GatewayError;
pub use shadowrun_notifier::{FakeShadowRunNotifier, HttpShadowRunNotifier, ShadowRunNotifier};
