// [libs/domain/scheduler/src/tick.rs]
use chrono::{DateTime, Timelike, Utc};

use crate::strategy::{Mode, Strategy};

/// One command the tick wants C9 to issue, including the idempotency key
/// derived from (station, template, minute_bucket) (spec.md §4.10 step 2).
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCommand {
    pub station_id: String,
    pub command_type: String,
    pub idempotency_key: String,
    pub payload: serde_json::Value,
}

fn minute_bucket(now: DateTime<Utc>) -> String {
    now.date_naive().and_hms_opt(now.hour(), now.minute(), 0).unwrap().to_string()
}

/// Evaluates one station's strategy against the current minute and the
/// latest telemetry sample for the template's required semantic
/// (spec.md §4.10). Returns `None` when no command should be emitted this
/// tick: disabled, out of window, manual mode (auto emission suppressed),
/// no sample yet, or the sample does not cross the template's threshold.
pub fn evaluate_tick(strategy: &Strategy, now: DateTime<Utc>, latest_grid_export_kw: Option<f64>) -> Option<ScheduledCommand> {
    if !strategy.enabled || strategy.mode != Mode::Auto {
        return None;
    }
    if !strategy.window_active_at(now.date_naive(), now.time()) {
        return None;
    }
    let value = latest_grid_export_kw?;
    let params = strategy.template_params;
    if value <= params.threshold_kw {
        return None;
    }

    let target_kw = value.min(params.max_kw).max(params.min_kw);

    Some(ScheduledCommand {
        station_id: strategy.station_id.clone(),
        command_type: "anti_backflow_setpoint".to_string(),
        idempotency_key: format!("{}:anti_backflow:{}", strategy.station_id, minute_bucket(now)),
        payload: serde_json::json!({ "target_kw": target_kw }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{AntiBackflowParams, CalendarWindow, TemplateType};
    use chrono::{NaiveTime, TimeZone};

    fn strategy(mode: Mode) -> Strategy {
        Strategy {
            tenant_id: "t1".into(),
            station_id: "s1".into(),
            mode,
            enabled: true,
            template_type: TemplateType::AntiBackflow,
            template_params: AntiBackflowParams {
                threshold_kw: 50.0,
                min_kw: 0.0,
                max_kw: 100.0,
            },
            calendar_windows: vec![CalendarWindow {
                date: Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap().date_naive(),
                enabled: true,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            }],
        }
    }

    #[test]
    fn emits_a_command_when_threshold_is_crossed_inside_the_window() {
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap();
        let cmd = evaluate_tick(&strategy(Mode::Auto), now, Some(80.0)).unwrap();
        assert_eq!(cmd.payload["target_kw"], 80.0);
    }

    #[test]
    fn manual_mode_suppresses_auto_emission() {
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap();
        assert!(evaluate_tick(&strategy(Mode::Manual), now, Some(80.0)).is_none());
    }

    #[test]
    fn outside_window_emits_nothing() {
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 20, 0, 0).unwrap();
        assert!(evaluate_tick(&strategy(Mode::Auto), now, Some(80.0)).is_none());
    }

    #[test]
    fn below_threshold_emits_nothing() {
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap();
        assert!(evaluate_tick(&strategy(Mode::Auto), now, Some(10.0)).is_none());
    }
}
