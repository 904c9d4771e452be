// [apps/orchestrator/src/bootstrap.rs]
//! Startup integrity check, grounded on the teacher's
//! `Bootstrap::spawn_diagnostics`: a background task that verifies the
//! database is reachable and on the expected schema before the kernel
//! marks itself ready, logged rather than gating process exit — a
//! transient connection hiccup should not crash a process the supervisor
//! will restart into the same state anyway.

use tracing::{error, info, instrument};

use crate::state::AppState;

pub struct Bootstrap;

impl Bootstrap {
    /// Applies the schema (idempotent: every statement is `CREATE TABLE IF
    /// NOT EXISTS`) so a fresh database or one a `migrator` run never
    /// reached is still usable, then logs readiness.
    #[instrument(skip(state))]
    pub fn spawn_diagnostics(state: AppState) {
        tokio::spawn(async move {
            match Self::run(&state).await {
                Ok(()) => info!("bootstrap: schema verified, orchestrator ready"),
                Err(error) => error!(%error, "bootstrap: schema verification failed"),
            }
        });
    }

    async fn run(state: &AppState) -> Result<(), gridforge_infra_db::DbError> {
        let conn = state.db.connection()?;
        gridforge_infra_db::schema::apply_schema(&conn).await
    }
}
