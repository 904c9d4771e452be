// [apps/orchestrator/src/bin/migrator.rs]
//! Operator binary: applies the schema (idempotent `CREATE TABLE IF NOT
//! EXISTS`, see `gridforge_infra_db::schema`) against `DATABASE_URL`.
//! Exit codes follow spec.md §6: 0 success, 2 bad arguments, non-zero
//! otherwise.

use dotenvy::dotenv;
use gridforge_infra_db::DbClient;
use gridforge_shared_observability::init_tracing;
use tracing::{error, info};

fn main() {
    dotenv().ok();
    init_tracing("gridforge_migrator");

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => url,
        _ => {
            error!("DATABASE_URL must be set");
            std::process::exit(2);
        }
    };
    let auth_token = std::env::var("TURSO_AUTH_TOKEN").ok();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            error!(%error, "failed to start tokio runtime");
            std::process::exit(1);
        }
    };

    let outcome = runtime.block_on(async move {
        info!("applying schema to {database_url}");
        DbClient::connect(&database_url, auth_token).await
    });

    match outcome {
        // `DbClient::connect` already applies the schema at connection time
        // (see `libs/infra/db/src/client.rs`); a successful connect is the
        // migration.
        Ok(_client) => {
            info!("schema applied successfully");
        }
        Err(error) => {
            error!(%error, "schema migration failed");
            std::process::exit(1);
        }
    }
}
