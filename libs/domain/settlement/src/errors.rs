// [libs/domain/settlement/src/errors.rs]
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettlementError {
    #[error("[SETTLEMENT_INCOMPLETE_HOURS]: station '{station_id}' day {day_start} has fewer than the expected hours")]
    IncompleteHours { station_id: String, day_start: DateTime<Utc> },

    #[error("[SETTLEMENT_NO_TARIFF]: no tariff rule or fallback price covers minute {minute_of_day} of the day")]
    NoTariffCoverage { minute_of_day: u32 },

    #[error("[SETTLEMENT_FREEZE_REQUIRES_DRAFT]: only a draft statement can be frozen")]
    FreezeRequiresDraft,

    #[error("[SETTLEMENT_VOID_REQUIRES_ACTIVE]: only a draft or frozen statement can be voided")]
    VoidRequiresActive,

    #[error("[SETTLEMENT_ACTIVE_EXISTS]: an active (draft or frozen) statement already exists for this month; pass regenerate=true")]
    ActiveStatementExists,
}
