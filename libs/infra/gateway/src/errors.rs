// [libs/infra/gateway/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("[GATEWAY_NETWORK_FAULT]: request to device gateway failed -> {0}")]
    Network(#[from] reqwest::Error),

    #[error("[GATEWAY_REJECTED]: device gateway returned {0}")]
    Rejected(String),

    #[error("[GATEWAY_DECODE_FAULT]: response body did not decode -> {0}")]
    Decode(#[from] serde_json::Error),

    #[error("[GATEWAY_CONFIG_FAULT]: {0}")]
    Configuration(String),
}
