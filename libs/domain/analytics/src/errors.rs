// [libs/domain/analytics/src/errors.rs]
use chrono::{DateTime, Utc};
use gridforge_domain_events::Granularity;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("[ANALYTICS_NO_MAPPINGS]: no point mappings for station '{station_id}'")]
    NoMappings { station_id: String },

    #[error("[ANALYTICS_MISALIGNED_PERIOD]: {period_start} is not aligned to a {granularity:?} boundary")]
    MisalignedPeriod {
        granularity: Granularity,
        period_start: DateTime<Utc>,
    },

    #[error("[ANALYTICS_INVALID_FACT]: completed fact must be finite and non-negative")]
    InvalidFact,
}
