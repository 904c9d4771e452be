// [apps/orchestrator/src/errors.rs]
//! Composition-root error type: every layer's `thiserror` enum folded into
//! one, so a service function can return a single `Result` without the
//! caller caring which crate raised it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Db(#[from] gridforge_infra_db::DbError),

    #[error(transparent)]
    Event(#[from] gridforge_domain_events::EventError),

    #[error(transparent)]
    Telemetry(#[from] gridforge_domain_telemetry::TelemetryError),

    #[error(transparent)]
    Analytics(#[from] gridforge_domain_analytics::AnalyticsError),

    #[error(transparent)]
    Settlement(#[from] gridforge_domain_settlement::SettlementError),

    #[error(transparent)]
    Command(#[from] gridforge_domain_commands::CommandError),

    #[error(transparent)]
    ShadowRun(#[from] gridforge_domain_shadowrun::ShadowRunError),

    #[error(transparent)]
    Gateway(#[from] gridforge_infra_gateway::GatewayError),

    #[error("[ORCH_VALIDATION]: {0}")]
    Validation(String),
}
