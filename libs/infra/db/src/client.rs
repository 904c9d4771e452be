// [libs/infra/db/src/client.rs]
//! Connection management, grounded on the teacher's `TursoClient`: detects
//! in-memory URLs and keeps an anchor connection alive so the schema
//! survives across pooled connections (`:memory:?cache=shared` otherwise
//! loses its tables the moment the bootstrap connection drops).

use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use tracing::{info, instrument};

use crate::errors::DbError;
use crate::schema::apply_schema;

#[derive(Clone)]
pub struct DbClient {
    database: Arc<Database>,
    _memory_anchor: Option<Arc<Connection>>,
}

impl DbClient {
    #[instrument(skip(auth_token))]
    pub async fn connect(database_url: &str, auth_token: Option<String>) -> Result<Self, DbError> {
        if database_url.is_empty() {
            return Err(DbError::Configuration("DATABASE_URL is empty".into()));
        }

        let is_remote = database_url.starts_with("libsql://") || database_url.starts_with("https://");
        let is_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let database = if is_remote {
            let token = auth_token.ok_or_else(|| DbError::Configuration("remote connection requires an auth token".into()))?;
            Builder::new_remote(database_url.to_string(), token).build().await
        } else {
            Builder::new_local(database_url).build().await
        }
        .map_err(|e| DbError::Connection(e.to_string()))?;

        let database = Arc::new(database);
        let mut anchor = None;

        if is_memory {
            let anchor_conn = database.connect().map_err(|e| DbError::Connection(e.to_string()))?;
            apply_schema(&anchor_conn).await?;
            anchor = Some(Arc::new(anchor_conn));
            info!("in-memory schema anchored for the lifetime of this client");
        } else {
            let bootstrap_conn = database.connect().map_err(|e| DbError::Connection(e.to_string()))?;
            apply_schema(&bootstrap_conn).await?;
        }

        Ok(Self {
            database,
            _memory_anchor: anchor,
        })
    }

    pub fn connection(&self) -> Result<Connection, DbError> {
        self.database.connect().map_err(|e| DbError::Connection(e.to_string()))
    }
}
