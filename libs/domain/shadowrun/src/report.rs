// [libs/domain/shadowrun/src/report.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{DiffSummary, RecommendedAction};

/// Points at the archived CSV/JSON artifacts for one job run
/// (spec.md §4.11 step 5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowReport {
    pub tenant_id: String,
    pub station_id: String,
    pub month: DateTime<Utc>,
    pub diff_energy_max: f64,
    pub diff_amount_max: f64,
    pub missing_hours_total: u32,
    pub recommended_action: RecommendedAction,
    pub archive_path: String,
}

impl ShadowReport {
    pub fn from_summary(tenant_id: &str, station_id: &str, month: DateTime<Utc>, summary: DiffSummary, recommended_action: RecommendedAction, archive_path: &str) -> Self {
        ShadowReport {
            tenant_id: tenant_id.to_string(),
            station_id: station_id.to_string(),
            month,
            diff_energy_max: summary.diff_energy_max,
            diff_amount_max: summary.diff_amount_max,
            missing_hours_total: summary.missing_hours_total,
            recommended_action,
            archive_path: archive_path.to_string(),
        }
    }

    pub fn breached(&self) -> bool {
        self.recommended_action != RecommendedAction::None
    }
}

/// Raised alongside a breaching report; the notification itself is an
/// external collaborator (spec.md §4.11 step 7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowAlert {
    pub tenant_id: String,
    pub station_id: String,
    pub month: DateTime<Utc>,
    pub recommended_action: RecommendedAction,
    pub raised_at: DateTime<Utc>,
}
