// [libs/domain/settlement/src/statement.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::day_settlement::DaySettlement;
use crate::errors::SettlementError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementStatus {
    Draft,
    Frozen,
    Voided,
}

/// Identity = (tenant_id, station_id, statement_month, category, version)
/// (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub tenant_id: String,
    pub station_id: String,
    pub statement_month: DateTime<Utc>,
    pub category: String,
    pub version: u32,
    pub status: StatementStatus,
    pub total_energy_kwh: f64,
    pub total_amount: f64,
    pub currency: String,
    pub frozen_at: Option<DateTime<Utc>>,
    pub snapshot_hash: Option<String>,
    pub void_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementItem {
    pub day_start: DateTime<Utc>,
    pub energy_kwh: f64,
    pub amount: f64,
    pub currency: String,
}

/// At most one statement per (tenant, station, month, category) may be
/// draft or frozen at a time; `regenerate` creates version+1 (spec.md §3,
/// §4.7 "generate").
pub fn generate_statement(
    existing_active: Option<&Statement>,
    tenant_id: &str,
    station_id: &str,
    statement_month: DateTime<Utc>,
    category: &str,
    day_settlements: &[DaySettlement],
    regenerate: bool,
) -> Result<(Statement, Vec<StatementItem>), SettlementError> {
    if existing_active.is_some() && !regenerate {
        return Err(SettlementError::ActiveStatementExists);
    }

    let version = existing_active.map(|s| s.version + 1).unwrap_or(1);
    let currency = day_settlements
        .first()
        .map(|d| d.currency.clone())
        .or_else(|| existing_active.map(|s| s.currency.clone()))
        .unwrap_or_default();

    let total_energy_kwh: f64 = day_settlements.iter().map(|d| d.energy_kwh).sum();
    let total_amount: f64 = day_settlements.iter().map(|d| d.amount).sum();

    let items: Vec<StatementItem> = day_settlements
        .iter()
        .map(|d| StatementItem {
            day_start: d.day_start,
            energy_kwh: d.energy_kwh,
            amount: d.amount,
            currency: d.currency.clone(),
        })
        .collect();

    Ok((
        Statement {
            tenant_id: tenant_id.to_string(),
            station_id: station_id.to_string(),
            statement_month,
            category: category.to_string(),
            version,
            status: StatementStatus::Draft,
            total_energy_kwh,
            total_amount,
            currency,
            frozen_at: None,
            snapshot_hash: None,
            void_reason: None,
        },
        items,
    ))
}

/// Canonical serialization for the snapshot hash: items ordered by day,
/// JSON-encoded, SHA-256'd (spec.md §3, §4.7 "freeze").
pub fn canonical_items_hash(items: &[StatementItem]) -> Result<String, SettlementError> {
    let mut ordered = items.to_vec();
    ordered.sort_by_key(|item| item.day_start);
    let bytes = serde_json::to_vec(&ordered).map_err(|_| SettlementError::FreezeRequiresDraft)?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(digest))
}

pub fn freeze_statement(
    statement: &Statement,
    items: &[StatementItem],
    now: DateTime<Utc>,
) -> Result<Statement, SettlementError> {
    if statement.status != StatementStatus::Draft {
        return Err(SettlementError::FreezeRequiresDraft);
    }
    let snapshot_hash = canonical_items_hash(items)?;
    Ok(Statement {
        status: StatementStatus::Frozen,
        frozen_at: Some(now),
        snapshot_hash: Some(snapshot_hash),
        ..statement.clone()
    })
}

pub fn void_statement(statement: &Statement, reason: &str) -> Result<Statement, SettlementError> {
    if statement.status == StatementStatus::Voided {
        return Err(SettlementError::VoidRequiresActive);
    }
    Ok(Statement {
        status: StatementStatus::Voided,
        void_reason: Some(reason.to_string()),
        ..statement.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day_settlement::SettlementStatus;
    use chrono::TimeZone;

    fn day_settlement(day: u32, amount: f64) -> DaySettlement {
        DaySettlement {
            tenant_id: "t1".into(),
            station_id: "s1".into(),
            day_start: Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap(),
            energy_kwh: amount,
            amount,
            currency: "CNY".into(),
            status: SettlementStatus::Calculated,
            version: 1,
        }
    }

    #[test]
    fn generate_sums_day_settlements_into_totals() {
        let month = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let (stmt, items) =
            generate_statement(None, "t1", "s1", month, "energy", &[day_settlement(1, 10.0), day_settlement(2, 20.0)], false).unwrap();
        assert_eq!(stmt.total_amount, 30.0);
        assert_eq!(items.len(), 2);
        assert_eq!(stmt.version, 1);
    }

    #[test]
    fn generate_without_regenerate_rejects_existing_active() {
        let month = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let (existing, _) = generate_statement(None, "t1", "s1", month, "energy", &[day_settlement(1, 10.0)], false).unwrap();
        let err = generate_statement(Some(&existing), "t1", "s1", month, "energy", &[day_settlement(1, 10.0)], false).unwrap_err();
        assert_eq!(err, SettlementError::ActiveStatementExists);
    }

    #[test]
    fn freeze_is_deterministic_and_requires_draft() {
        let month = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let (stmt, items) = generate_statement(None, "t1", "s1", month, "energy", &[day_settlement(1, 10.0)], false).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let frozen_once = freeze_statement(&stmt, &items, now).unwrap();
        let frozen_twice = freeze_statement(&stmt, &items, now).unwrap();
        assert_eq!(frozen_once.snapshot_hash, frozen_twice.snapshot_hash);
        assert!(freeze_statement(&frozen_once, &items, now).is_err());
    }

    #[test]
    fn void_requires_draft_or_frozen() {
        let month = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let (stmt, _) = generate_statement(None, "t1", "s1", month, "energy", &[day_settlement(1, 10.0)], false).unwrap();
        let voided = void_statement(&stmt, "duplicate billing run").unwrap();
        assert!(void_statement(&voided, "again").is_err());
    }
}
