// [libs/domain/alarms/src/state_machine.rs]
use chrono::{DateTime, Utc};
use gridforge_core_clock::Ids;

use crate::alarm::{Alarm, AlarmStatus, OriginatorType, RuleState};
use crate::rule::AlarmRule;

/// What the caller must persist after evaluating one (rule, originator,
/// sample) triple (spec.md §4.8 step 4).
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    NoChange,
    ClearRuleState,
    CreateActive(Alarm),
    UpsertPending(RuleState),
    UpdateLastValue(f64),
    Clear(Alarm),
}

#[allow(clippy::too_many_arguments)]
pub fn evaluate(
    rule: &AlarmRule,
    originator_type: OriginatorType,
    originator_id: &str,
    value: f64,
    sample_ts: DateTime<Utc>,
    open_alarm: Option<&Alarm>,
    rule_state: Option<&RuleState>,
) -> Transition {
    let triggering = rule.operator.triggers(value, rule.threshold);

    if let Some(alarm) = open_alarm {
        if rule.operator.clears(value, rule.threshold, rule.hysteresis) {
            return Transition::Clear(Alarm {
                status: AlarmStatus::Cleared,
                end_at: Some(sample_ts),
                cleared_at: Some(sample_ts),
                last_value: value,
                ..alarm.clone()
            });
        }
        return Transition::UpdateLastValue(value);
    }

    if !triggering {
        return match rule_state {
            Some(_) => Transition::ClearRuleState,
            None => Transition::NoChange,
        };
    }

    if rule.duration_seconds == 0 {
        let id = Ids::alarm_id(&rule.tenant_id, &rule.rule_id, originator_id, sample_ts);
        return Transition::CreateActive(Alarm {
            id,
            tenant_id: rule.tenant_id.clone(),
            rule_id: rule.rule_id.clone(),
            originator_type,
            originator_id: originator_id.to_string(),
            severity: rule.severity,
            status: AlarmStatus::Active,
            start_at: sample_ts,
            end_at: None,
            last_value: value,
            acked_at: None,
            cleared_at: None,
        });
    }

    let pending_since = match rule_state {
        Some(state) => state.pending_since.min(sample_ts),
        None => sample_ts,
    };

    if (sample_ts - pending_since).num_seconds() >= rule.duration_seconds {
        let id = Ids::alarm_id(&rule.tenant_id, &rule.rule_id, originator_id, sample_ts);
        return Transition::CreateActive(Alarm {
            id,
            tenant_id: rule.tenant_id.clone(),
            rule_id: rule.rule_id.clone(),
            originator_type,
            originator_id: originator_id.to_string(),
            severity: rule.severity,
            status: AlarmStatus::Active,
            start_at: sample_ts,
            end_at: None,
            last_value: value,
            acked_at: None,
            cleared_at: None,
        });
    }

    Transition::UpsertPending(RuleState {
        tenant_id: rule.tenant_id.clone(),
        rule_id: rule.rule_id.clone(),
        originator_type,
        originator_id: originator_id.to_string(),
        pending_since,
        last_value: value,
    })
}

/// Operator-initiated acknowledge; a no-op if already acknowledged or
/// cleared (spec.md §4.8).
pub fn ack(alarm: &Alarm, now: DateTime<Utc>) -> Alarm {
    if alarm.status != AlarmStatus::Active {
        return alarm.clone();
    }
    Alarm {
        status: AlarmStatus::Acknowledged,
        acked_at: Some(now),
        ..alarm.clone()
    }
}

/// Operator-initiated clear; a no-op if already cleared.
pub fn clear(alarm: &Alarm, now: DateTime<Utc>) -> Alarm {
    if alarm.status == AlarmStatus::Cleared {
        return alarm.clone();
    }
    Alarm {
        status: AlarmStatus::Cleared,
        end_at: Some(now),
        cleared_at: Some(now),
        ..alarm.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Operator, Severity};
    use chrono::TimeZone;

    fn rule(duration_seconds: i64) -> AlarmRule {
        AlarmRule {
            tenant_id: "t1".into(),
            station_id: "s1".into(),
            rule_id: "r1".into(),
            semantic: gridforge_domain_telemetry::Semantic::ChargePowerKw,
            operator: Operator::Gt,
            threshold: 100.0,
            hysteresis: 5.0,
            duration_seconds,
            severity: Severity::High,
            enabled: true,
        }
    }

    #[test]
    fn scenario_s4_active_then_clear() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let transition = evaluate(&rule(0), OriginatorType::Station, "s1", 120.0, ts, None, None);
        let alarm = match transition {
            Transition::CreateActive(alarm) => alarm,
            other => panic!("expected CreateActive, got {other:?}"),
        };
        assert_eq!(alarm.status, AlarmStatus::Active);

        let transition = evaluate(&rule(0), OriginatorType::Station, "s1", 90.0, ts + chrono::Duration::minutes(1), Some(&alarm), None);
        match transition {
            Transition::Clear(cleared) => assert_eq!(cleared.status, AlarmStatus::Cleared),
            other => panic!("expected Clear, got {other:?}"),
        }
    }

    #[test]
    fn duration_gate_delays_activation_until_satisfied() {
        let ts0 = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let rule = rule(60);
        let first = evaluate(&rule, OriginatorType::Station, "s1", 120.0, ts0, None, None);
        let state = match first {
            Transition::UpsertPending(state) => state,
            other => panic!("expected UpsertPending, got {other:?}"),
        };
        let second = evaluate(&rule, OriginatorType::Station, "s1", 120.0, ts0 + chrono::Duration::seconds(90), None, Some(&state));
        assert!(matches!(second, Transition::CreateActive(_)));
    }

    #[test]
    fn ack_is_a_no_op_when_already_cleared() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let alarm = match evaluate(&rule(0), OriginatorType::Station, "s1", 120.0, ts, None, None) {
            Transition::CreateActive(alarm) => clear(&alarm, ts),
            _ => unreachable!(),
        };
        let acked = ack(&alarm, ts);
        assert_eq!(acked.status, AlarmStatus::Cleared);
    }
}
