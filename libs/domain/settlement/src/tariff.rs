// [libs/domain/settlement/src/tariff.rs]
use serde::{Deserialize, Serialize};

use crate::errors::SettlementError;

/// A non-overlapping `[start_minute, end_minute)` window of the day with a
/// fixed price (spec.md §4.7 step 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffRule {
    pub start_minute: u32,
    pub end_minute: u32,
    pub price_per_kwh: f64,
}

impl TariffRule {
    pub fn covers(&self, minute_of_day: u32) -> bool {
        minute_of_day >= self.start_minute && minute_of_day < self.end_minute
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffPlan {
    pub currency: String,
    pub rules: Vec<TariffRule>,
    /// Flat price used when no rule covers the queried minute.
    pub fallback_price: Option<f64>,
}

impl TariffPlan {
    pub fn price_at(&self, minute_of_day: u32) -> Result<f64, SettlementError> {
        if let Some(rule) = self.rules.iter().find(|r| r.covers(minute_of_day)) {
            return Ok(rule.price_per_kwh);
        }
        self.fallback_price
            .ok_or(SettlementError::NoTariffCoverage { minute_of_day })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_wins_over_fallback_when_it_covers_the_minute() {
        let plan = TariffPlan {
            currency: "CNY".into(),
            rules: vec![TariffRule {
                start_minute: 0,
                end_minute: 1440,
                price_per_kwh: 1.0,
            }],
            fallback_price: Some(0.5),
        };
        assert_eq!(plan.price_at(600).unwrap(), 1.0);
    }

    #[test]
    fn fallback_used_when_no_rule_covers_the_minute() {
        let plan = TariffPlan {
            currency: "CNY".into(),
            rules: vec![],
            fallback_price: Some(0.8),
        };
        assert_eq!(plan.price_at(10).unwrap(), 0.8);
    }

    #[test]
    fn no_coverage_and_no_fallback_is_an_error() {
        let plan = TariffPlan {
            currency: "CNY".into(),
            rules: vec![],
            fallback_price: None,
        };
        assert!(plan.price_at(10).is_err());
    }
}
