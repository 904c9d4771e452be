// [libs/domain/shadowrun/src/lib.rs]
//! Monthly shadow-reconciliation job (C11): independent recomputation,
//! diffing against the primary pipeline, and threshold-based alerting.

mod diff;
mod errors;
mod job;
mod report;

pub use diff::{compute_day_diff, recommend, summarize, DayDiff, DiffSummary, RecommendedAction, ShadowThresholds};
pub use errors::ShadowRunError;
pub use job::{JobStatus, ShadowJob};
pub use report::{ShadowAlert, ShadowReport};
