// [apps/orchestrator/src/lib.rs]
//! Composition root: wires the telemetry, analytics, settlement, alarm,
//! command, scheduler and shadow-run pipelines onto the transactional
//! outbox. No HTTP surface — SPEC_FULL.md §6 stops at the service layer;
//! `kernel.rs` spawns the background daemons a future HTTP layer would sit
//! in front of.

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod event_bus;
pub mod kernel;
pub mod services;
pub mod state;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::errors::OrchestratorError;
    pub use crate::kernel::OrchestratorKernel;
    pub use crate::state::AppState;
}
