// [libs/domain/alarms/src/rule.rs]
use gridforge_domain_telemetry::Semantic;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    pub fn triggers(&self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Gt => value > threshold,
            Operator::Ge => value >= threshold,
            Operator::Lt => value < threshold,
            Operator::Le => value <= threshold,
        }
    }

    /// The clearing condition is the triggering condition pushed back by
    /// `hysteresis` so a value oscillating around the threshold does not
    /// chatter between active and cleared (spec.md §4.8 step 4).
    pub fn clears(&self, value: f64, threshold: f64, hysteresis: f64) -> bool {
        match self {
            Operator::Gt | Operator::Ge => value < threshold - hysteresis,
            Operator::Lt | Operator::Le => value > threshold + hysteresis,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn is_escalation_eligible(&self) -> bool {
        *self >= Severity::High
    }
}

/// (tenant_id, station_id, rule_id) -> trigger condition (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmRule {
    pub tenant_id: String,
    pub station_id: String,
    pub rule_id: String,
    pub semantic: Semantic,
    pub operator: Operator,
    pub threshold: f64,
    pub hysteresis: f64,
    pub duration_seconds: i64,
    pub severity: Severity,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greater_than_trigger_and_clear_with_hysteresis() {
        let op = Operator::Gt;
        assert!(op.triggers(120.0, 100.0));
        assert!(!op.clears(96.0, 100.0, 5.0));
        assert!(op.clears(90.0, 100.0, 5.0));
    }

    #[test]
    fn less_than_trigger_and_clear_with_hysteresis() {
        let op = Operator::Lt;
        assert!(op.triggers(10.0, 20.0));
        assert!(op.clears(30.0, 20.0, 5.0));
        assert!(!op.clears(24.0, 20.0, 5.0));
    }
}
