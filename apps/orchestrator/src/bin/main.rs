// [apps/orchestrator/src/bin/main.rs]
//! Process entry point: loads `.env`, initializes tracing, ignites the
//! kernel, and awaits every background daemon for the life of the process.

use dotenvy::dotenv;
use gridforge_orchestrator::prelude::*;
use gridforge_shared_observability::init_tracing;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing("gridforge_orchestrator");

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(async {
        let config = Config::from_env();
        info!("orchestrator starting up");

        let kernel = match OrchestratorKernel::ignite(config).await {
            Ok(kernel) => kernel,
            Err(error) => {
                error!(%error, "failed to ignite orchestrator kernel");
                std::process::exit(1);
            }
        };

        let handles = kernel.launch();
        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    })
}
