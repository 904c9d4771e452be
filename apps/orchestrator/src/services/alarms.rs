// [apps/orchestrator/src/services/alarms.rs]
//! C8: the alarm evaluator consumer, the escalation timer daemon it feeds
//! into, and the two operator entry points (ack/clear). Grounded on
//! `gridforge_domain_alarms::state_machine` for the transition logic and
//! on `services/commands.rs`'s fan-out shape for turning a `Transition`
//! into persistence plus an outbound notification.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use gridforge_domain_alarms::{evaluate, should_escalate, ack as domain_ack, clear as domain_clear, Alarm, AlarmEvent, AlarmEventType, OriginatorType, Transition};
use gridforge_domain_events::payload::PointValue;
use gridforge_domain_events::{DomainEvent, EventEnvelope};
use gridforge_domain_telemetry::{resolve_mapping, Semantic};
use gridforge_infra_db::repositories::alarms;
use gridforge_infra_gateway::AlarmNotifier;
use tokio::time::interval;
use tracing::{error, instrument, warn};

use crate::errors::OrchestratorError;
use crate::state::AppState;

pub struct AlarmEvaluator;

impl AlarmEvaluator {
    /// `alarm_evaluator` consumer: resolves every point in a `TelemetryReceived`
    /// batch to its semantic, evaluates each enabled rule against the
    /// freshest sample for that semantic, and persists/notifies the result.
    #[instrument(skip(state, envelope))]
    pub async fn evaluate_sample(state: &AppState, envelope: &EventEnvelope) -> Result<(), OrchestratorError> {
        let DomainEvent::TelemetryReceived(event) = &envelope.payload else {
            return Ok(());
        };
        let conn = state.db.connection()?;

        let mappings = state.mapping_cache.get(&conn, &event.station_id).await?;
        let rules = alarms::load_enabled_rules(&conn, &event.tenant_id, &event.station_id).await?;
        if rules.is_empty() {
            return Ok(());
        }

        let mut latest: HashMap<Semantic, (f64, DateTime<Utc>)> = HashMap::new();
        for point in &event.points {
            let PointValue::Numeric(raw) = point.value else { continue };
            let Some(mapping) = resolve_mapping(&mappings, &event.station_id, Some(event.device_id.as_str()), &point.point_key) else {
                continue;
            };
            let scaled = mapping.apply(raw);
            latest
                .entry(mapping.semantic)
                .and_modify(|(v, ts)| {
                    if point.ts >= *ts {
                        *v = scaled;
                        *ts = point.ts;
                    }
                })
                .or_insert((scaled, point.ts));
        }

        for rule in &rules {
            let Some(&(value, sample_ts)) = latest.get(&rule.semantic) else {
                continue;
            };
            // spec.md §4.8 step 3: originator is the device when present,
            // else the station. `TelemetryReceived` always carries a
            // device_id, so every sample here is attributed to its device —
            // two devices breaching the same rule get distinct alarm
            // identities instead of colliding on the station.
            let open_alarm = alarms::find_open_alarm(&conn, &event.tenant_id, &rule.rule_id, &event.device_id).await?;
            let rule_state = alarms::load_rule_state(&conn, &event.tenant_id, &rule.rule_id, &event.device_id).await?;

            let transition = evaluate(rule, OriginatorType::Device, &event.device_id, value, sample_ts, open_alarm.as_ref(), rule_state.as_ref());
            Self::apply_transition(state, &conn, &event.tenant_id, &rule.rule_id, &event.device_id, transition).await?;
        }
        Ok(())
    }

    async fn apply_transition(
        state: &AppState,
        conn: &libsql::Connection,
        tenant_id: &str,
        rule_id: &str,
        originator_id: &str,
        transition: Transition,
    ) -> Result<(), OrchestratorError> {
        match transition {
            Transition::NoChange => {}
            Transition::ClearRuleState => alarms::clear_rule_state(conn, tenant_id, rule_id, originator_id).await?,
            Transition::UpsertPending(rule_state) => alarms::upsert_rule_state(conn, &rule_state).await?,
            Transition::UpdateLastValue(value) => {
                if let Some(mut alarm) = alarms::find_open_alarm(conn, tenant_id, rule_id, originator_id).await? {
                    alarm.last_value = value;
                    alarms::upsert_alarm(conn, &alarm).await?;
                }
            }
            Transition::CreateActive(alarm) => {
                alarms::clear_rule_state(conn, tenant_id, rule_id, originator_id).await?;
                alarms::upsert_alarm(conn, &alarm).await?;
                Self::notify(state, AlarmEventType::Active, alarm).await;
            }
            Transition::Clear(alarm) => {
                alarms::upsert_alarm(conn, &alarm).await?;
                Self::notify(state, AlarmEventType::Cleared, alarm).await;
            }
        }
        Ok(())
    }

    /// Publishes to the live SSE-equivalent bus unconditionally and to the
    /// outbound webhook behind cooldown/dedupe suppression (spec.md §4.8
    /// step 6). A notifier failure is logged, not propagated — a dropped
    /// webhook delivery must never dead-letter the telemetry event that
    /// triggered it.
    async fn notify(state: &AppState, event_type: AlarmEventType, alarm: Alarm) {
        let now = state.now();
        let event = AlarmEvent { event_type, alarm };
        state.alarm_bus.publish(event.clone());

        let body = match serde_json::to_string(&event) {
            Ok(body) => body,
            Err(error) => {
                warn!(%error, "failed to serialize alarm event for dedupe key");
                return;
            }
        };
        let suppressed = {
            let mut cooldown = state.alarm_cooldown.lock().expect("alarm cooldown tracker mutex poisoned");
            let mut dedupe = state.alarm_dedupe.lock().expect("alarm dedupe tracker mutex poisoned");
            cooldown.should_suppress(&event.alarm.id, event.event_type, now, state.config.alarm_cooldown)
                || dedupe.should_suppress(&body, now, state.config.alarm_dedupe_window)
        };
        if suppressed {
            return;
        }
        if let Err(error) = state.alarm_notifier.notify(&event).await {
            warn!(%error, alarm_id = %event.alarm.id, "alarm webhook delivery failed");
        }
    }

    /// Operator-initiated acknowledge.
    pub async fn ack(state: &AppState, tenant_id: &str, rule_id: &str, originator_id: &str) -> Result<(), OrchestratorError> {
        let now = state.now();
        let conn = state.db.connection()?;
        let Some(alarm) = alarms::find_open_alarm(&conn, tenant_id, rule_id, originator_id).await? else {
            return Err(gridforge_infra_db::DbError::NotFound.into());
        };
        let acked = domain_ack(&alarm, now);
        alarms::upsert_alarm(&conn, &acked).await?;
        Self::notify(state, AlarmEventType::Acknowledged, acked).await;
        Ok(())
    }

    /// Operator-initiated clear, bypassing the hysteresis gate in `evaluate`.
    pub async fn clear(state: &AppState, tenant_id: &str, rule_id: &str, originator_id: &str) -> Result<(), OrchestratorError> {
        let now = state.now();
        let conn = state.db.connection()?;
        let Some(alarm) = alarms::find_open_alarm(&conn, tenant_id, rule_id, originator_id).await? else {
            return Err(gridforge_infra_db::DbError::NotFound.into());
        };
        let cleared = domain_clear(&alarm, now);
        alarms::upsert_alarm(&conn, &cleared).await?;
        Self::notify(state, AlarmEventType::Cleared, cleared).await;
        Ok(())
    }
}

/// Periodically rechecks every open alarm against `should_escalate` and
/// notifies once an eligible alarm has been active past the configured
/// delay (spec.md §4.8 step 6, §9 "escalation timers"). Deliberately reuses
/// the cooldown tracker so a re-check every tick does not re-notify.
pub fn spawn_escalation_timer(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(state.config.alarm_escalation_check_interval);
        loop {
            ticker.tick().await;
            if let Err(error) = run_escalation_sweep(&state).await {
                error!(%error, "escalation sweep failed");
            }
        }
    })
}

async fn run_escalation_sweep(state: &AppState) -> Result<(), OrchestratorError> {
    let now = state.now();
    let conn = state.db.connection()?;
    let open_alarms = alarms::list_active(&conn).await?;
    for alarm in open_alarms {
        if should_escalate(&alarm, now, state.config.alarm_escalation_delay) {
            AlarmEvaluator::notify(state, AlarmEventType::Escalated, alarm).await;
        }
    }
    Ok(())
}
