// [apps/orchestrator/src/bin/dlq_tool.rs]
//! Operator binary for the dead-letter queue: `list` prints every
//! dead-lettered event, `replay <event_id>` requeues one back onto the
//! outbox (spec.md §4.2/§7 — a failed row never retries on its own; an
//! operator decides). Exit codes follow spec.md §6: 0 success, 2 bad
//! arguments, non-zero otherwise.

use dotenvy::dotenv;
use gridforge_infra_db::repositories::outbox;
use gridforge_infra_db::DbClient;
use gridforge_shared_observability::init_tracing;
use tracing::{error, info};

fn usage() -> ! {
    eprintln!("usage: gridforge-dlq-tool <list|replay> [event_id]");
    std::process::exit(2);
}

fn main() {
    dotenv().ok();
    init_tracing("gridforge_dlq_tool");

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| usage());

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

    let result = runtime.block_on(async move {
        let db = DbClient::connect(&database_url, auth_token).await?;
        let conn = db.connection()?;

        match command.as_str() {
            "list" => {
                let rows = outbox::list_dead_letters(&conn).await?;
                if rows.is_empty() {
                    info!("dead-letter queue is empty");
                }
                for row in rows {
                    println!("{}\t{}\tattempts={}\t{}", row.event_id, row.event_type, row.attempts, row.error);
                }
                Ok(())
            }
            "replay" => {
                let Some(event_id) = args.next() else {
                    usage();
                };
                outbox::replay_dead_letter(&conn, &event_id, chrono::Utc::now()).await?;
                info!(%event_id, "requeued dead-lettered event");
                Ok(())
            }
            _ => usage(),
        }
    });

    if let Err(error) = result {
        let error: gridforge_infra_db::DbError = error;
        error!(%error, "dlq-tool failed");
        std::process::exit(1);
    }
}
