// [apps/orchestrator/src/kernel.rs]
//! Composition root, grounded on the teacher's `OrchestratorKernel`:
//! connects the database and outbound gateways, then spawns one
//! `tokio::spawn` per background daemon. Every daemon is fire-and-forget,
//! observed only through `tracing` (spec.md §5, SPEC_FULL.md §5) — a bad
//! tick logs and keeps the loop alive rather than crashing the process.

use tracing::info;

use crate::bootstrap::Bootstrap;
use crate::config::Config;
use crate::services::alarms::spawn_escalation_timer;
use crate::services::commands::spawn_command_sweeper_loop;
use crate::services::outbox_dispatcher::spawn_dispatcher_loop;
use crate::services::scheduler::spawn_scheduler_loop;
use crate::services::shadowrun::spawn_shadowrun_loop;
use crate::state::AppState;

pub struct OrchestratorKernel {
    pub state: AppState,
}

impl OrchestratorKernel {
    /// Connects the database and the device-gateway/alarm-notifier clients
    /// from `config`.
    pub async fn ignite(config: Config) -> Result<Self, gridforge_infra_db::DbError> {
        let state = AppState::connect(config).await?;
        Ok(Self { state })
    }

    /// Spawns every background daemon and returns their join handles. The
    /// caller (`main.rs`) awaits them so the process stays alive for as
    /// long as any daemon does; a daemon panicking is the one failure mode
    /// that surfaces as a non-zero exit, matching spec.md §6's "non-zero
    /// otherwise" for anything unexpected.
    pub fn launch(self) -> Vec<tokio::task::JoinHandle<()>> {
        Bootstrap::spawn_diagnostics(self.state.clone());

        let handles = vec![
            spawn_dispatcher_loop(self.state.clone()),
            spawn_command_sweeper_loop(self.state.clone()),
            spawn_scheduler_loop(self.state.clone()),
            spawn_shadowrun_loop(self.state.clone()),
            spawn_escalation_timer(self.state.clone()),
        ];

        info!("orchestrator daemons online: dispatcher, command sweeper, scheduler, shadow-run, alarm escalation");
        handles
    }
}
