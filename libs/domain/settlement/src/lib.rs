// [libs/domain/settlement/src/lib.rs]
//! Day settlement computation and the monthly statement lifecycle (C7).

mod day_settlement;
mod errors;
mod statement;
mod tariff;

pub use day_settlement::{compute_day_totals, upsert_day_settlement, DaySettlement, SettlementStatus, SettlementUpsertOutcome};
pub use errors::SettlementError;
pub use statement::{canonical_items_hash, freeze_statement, generate_statement, void_statement, Statement, StatementItem, StatementStatus};
pub use tariff::{TariffPlan, TariffRule};
