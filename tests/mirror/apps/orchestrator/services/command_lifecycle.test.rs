//! S3 (idempotent re-issue collapses to one dispatch) and S5 (a command
//! that never acks times out once `command_timeout` has elapsed).

#[path = "../support.rs"]
mod support;

use gridforge_domain_commands::{sweep_timeout, CommandStatus, RpcResult};
use gridforge_infra_db::repositories::commands;
use gridforge_orchestrator::services::commands::CommandService;
use gridforge_orchestrator::services::outbox_dispatcher::OutboxDispatcher;
use serde_json::json;

const TENANT: &str = "t1";
const STATION: &str = "s1";
const DEVICE: &str = "d1";

#[tokio::test]
async fn scenario_s3_reissuing_the_same_idempotency_key_dispatches_only_once() {
    let now = support::fixed_point(2026, 4, 1, 0);
    let (state, _clock, fakes) = support::build_state(now, vec![RpcResult::Acked, RpcResult::Acked]).await;

    CommandService::issue(&state, TENANT, STATION, DEVICE, "setpoint", json!({"target_kw": 10.0}), Some("k1"), now)
        .await
        .unwrap();
    CommandService::issue(&state, TENANT, STATION, DEVICE, "setpoint", json!({"target_kw": 10.0}), Some("k1"), now)
        .await
        .unwrap();

    // Only one `commands` row and one `CommandIssued` event exist; the
    // second `issue` call matched the first within the idempotency window.
    let conn = state.db.connection().unwrap();
    let mut rows = conn.query("SELECT count(*) FROM commands", ()).await.unwrap();
    let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
    assert_eq!(count, 1);

    let processed = OutboxDispatcher::tick(&state).await.unwrap();
    assert_eq!(processed, 1);

    assert_eq!(fakes.device_client.sent_commands().len(), 1);

    let sent = &fakes.device_client.sent_commands()[0];
    assert_eq!(sent.idempotency_key, "k1");

    let persisted = commands::find_by_id(&conn, &sent.command_id).await.unwrap().expect("command persisted");
    assert_eq!(persisted.status, CommandStatus::Acked);
}

#[tokio::test]
async fn scenario_s3_a_different_idempotency_key_dispatches_a_second_command() {
    let now = support::fixed_point(2026, 4, 1, 0);
    let (state, _clock, fakes) = support::build_state(now, vec![RpcResult::Acked, RpcResult::Acked]).await;

    CommandService::issue(&state, TENANT, STATION, DEVICE, "setpoint", json!({"target_kw": 10.0}), Some("k1"), now)
        .await
        .unwrap();
    CommandService::issue(&state, TENANT, STATION, DEVICE, "setpoint", json!({"target_kw": 20.0}), Some("k2"), now)
        .await
        .unwrap();

    let processed = OutboxDispatcher::tick(&state).await.unwrap();
    assert_eq!(processed, 2);
    assert_eq!(fakes.device_client.sent_commands().len(), 2);
}

/// A command the gateway leaves SENT (no ack, no failure) is timed out by
/// the sweeper logic once `command_timeout` has elapsed; before that it is
/// left alone. The background sweeper daemon itself is a tokio loop with no
/// externally observable unit to call here, so this replicates its one
/// per-tick pass: `list_sent` + `sweep_timeout` + `update_status`.
#[tokio::test]
async fn scenario_s5_a_sent_command_with_no_ack_times_out_after_the_configured_window() {
    let now = support::fixed_point(2026, 4, 1, 0);
    let (state, clock, _fakes) = support::build_state(now, vec![RpcResult::Sent]).await;

    CommandService::issue(&state, TENANT, STATION, DEVICE, "setpoint", json!({"target_kw": 10.0}), Some("k1"), now)
        .await
        .unwrap();
    let processed = OutboxDispatcher::tick(&state).await.unwrap();
    assert_eq!(processed, 1);

    let conn = state.db.connection().unwrap();
    let sent_commands = commands::list_sent(&conn).await.unwrap();
    assert_eq!(sent_commands.len(), 1);
    assert_eq!(sent_commands[0].status, CommandStatus::Sent);

    // Before the timeout window elapses, a sweep pass leaves it alone.
    clock.advance(state.config.command_timeout - chrono::Duration::seconds(1));
    let still_sent = commands::list_sent(&conn).await.unwrap();
    for command in &still_sent {
        assert!(sweep_timeout(command, state.now(), state.config.command_timeout).is_none());
    }

    // Past the window, the sweep pass moves it to TIMEOUT.
    clock.advance(chrono::Duration::seconds(2));
    let still_sent = commands::list_sent(&conn).await.unwrap();
    for command in &still_sent {
        if let Some(timed_out) = sweep_timeout(command, state.now(), state.config.command_timeout) {
            commands::update_status(&conn, &timed_out).await.unwrap();
        }
    }

    let command_id = &sent_commands[0].command_id;
    let final_command = commands::find_by_id(&conn, command_id).await.unwrap().expect("command still exists");
    assert_eq!(final_command.status, CommandStatus::Timeout);
}
