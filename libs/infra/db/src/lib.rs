// [libs/infra/db/src/lib.rs]
//! libsql-backed persistence for every aggregate in the pipeline: the
//! telemetry store, the transactional outbox and dead-letter queue, the
//! per-consumer idempotency ledger, and the analytics/settlement/alarm/
//! command/scheduler/shadow-run tables.
//!
//! This crate never makes a domain decision; every repository function
//! loads rows into the matching `gridforge-domain-*` type, or persists one
//! that a domain function already produced.

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::DbClient;
pub use errors::DbError;
