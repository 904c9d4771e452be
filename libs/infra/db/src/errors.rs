// [libs/infra/db/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("[DB_CONN_FAULT]: connection failed -> {0}")]
    Connection(String),

    #[error("[DB_CONFIG_FAULT]: missing or empty configuration -> {0}")]
    Configuration(String),

    #[error("[DB_QUERY_FAULT]: query rejected -> {0}")]
    Query(#[from] libsql::Error),

    #[error("[DB_MAPPING_FAULT]: row-to-domain mapping failed -> {0}")]
    Mapping(String),

    #[error("[DB_NOT_FOUND]: no row for the requested identity")]
    NotFound,

    #[error("[DB_CONFLICT]: {0}")]
    Conflict(String),
}
