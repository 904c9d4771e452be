// [libs/infra/db/src/repositories/mod.rs]
pub mod alarms;
pub mod analytics;
pub mod commands;
pub mod mapping;
pub mod outbox;
pub mod processed_events;
pub mod scheduler;
pub mod settlement;
pub mod shadowrun;
pub mod telemetry;
