//! Exercises the transactional outbox dispatcher itself (C4/C5): a claimed
//! row is acked exactly once per consumer, and a consumer failure routes
//! straight to the dead-letter queue with no automatic retry (spec.md §9).

#[path = "../support.rs"]
mod support;

use gridforge_domain_events::{PointSample, PointValue};
use gridforge_domain_telemetry::{PointMapping, Semantic};
use gridforge_infra_db::repositories::{mapping, outbox, processed_events};
use gridforge_orchestrator::services::analytics::AnalyticsService;
use gridforge_orchestrator::services::ingest::IngestService;
use gridforge_orchestrator::services::outbox_dispatcher::OutboxDispatcher;
use libsql::params;

const TENANT: &str = "t1";
const STATION: &str = "s1";
const DEVICE: &str = "d1";

/// The single most-recently inserted outbox row's `event_id`, used to check
/// the idempotency ledger for a row this test just published.
async fn latest_event_id(state: &gridforge_orchestrator::state::AppState) -> String {
    let conn = state.db.connection().unwrap();
    let mut rows = conn.query("SELECT event_id FROM outbox ORDER BY id DESC LIMIT 1", params![]).await.unwrap();
    let row = rows.next().await.unwrap().expect("an outbox row exists");
    row.get(0).unwrap()
}

/// A `TelemetryReceived` row with no alarm rules configured fans out to the
/// `alarm_evaluator` consumer, which is a no-op, and the row ends up
/// `sent`. A second `tick` finds nothing left to claim.
#[tokio::test]
async fn successful_dispatch_is_claimed_once_and_marks_the_consumer_processed() {
    let now = support::fixed_point(2026, 2, 1, 0);
    let (state, _clock, _fakes) = support::build_state(now, vec![]).await;

    IngestService::ingest(
        &state,
        TENANT,
        STATION,
        DEVICE,
        vec![PointSample {
            point_key: "charge".into(),
            ts: now,
            value: PointValue::Numeric(10.0),
        }],
        now,
    )
    .await
    .unwrap();
    let event_id = latest_event_id(&state).await;

    let processed = OutboxDispatcher::tick(&state).await.unwrap();
    assert_eq!(processed, 1);

    let conn = state.db.connection().unwrap();
    assert!(processed_events::is_processed(&conn, &event_id, "alarm_evaluator").await.unwrap());

    // Nothing left pending: a second tick claims zero rows.
    let processed_again = OutboxDispatcher::tick(&state).await.unwrap();
    assert_eq!(processed_again, 0);

    assert!(outbox::list_dead_letters(&conn).await.unwrap().is_empty());
}

/// A `TelemetryWindowClosed` event for a station with no point mappings
/// fails `compute_fact` with `NoMappings`; the dispatcher dead-letters the
/// row on the first attempt rather than leaving it pending for a retry.
#[tokio::test]
async fn failed_consumer_dead_letters_immediately_with_no_retry() {
    let now = support::fixed_point(2026, 2, 1, 0);
    let (state, _clock, _fakes) = support::build_state(now, vec![]).await;

    // No mappings seeded for "unmapped-station".
    AnalyticsService::close_window(&state, TENANT, "unmapped-station", now, now + chrono::Duration::hours(1), false, now)
        .await
        .unwrap();

    let processed = OutboxDispatcher::tick(&state).await.unwrap();
    assert_eq!(processed, 1);

    let conn = state.db.connection().unwrap();
    let dead_letters = outbox::list_dead_letters(&conn).await.unwrap();
    assert_eq!(dead_letters.len(), 1);
    assert_eq!(dead_letters[0].event_type, "TelemetryWindowClosed");
    assert_eq!(dead_letters[0].attempts, 1);

    // The row is terminal: nothing pending remains to retry automatically.
    let processed_again = OutboxDispatcher::tick(&state).await.unwrap();
    assert_eq!(processed_again, 0);
    assert_eq!(outbox::list_dead_letters(&conn).await.unwrap().len(), 1);
}

/// Same event type with a working mapping set succeeds, proving the prior
/// test's failure was the missing mapping and not something else broken in
/// window closure.
#[tokio::test]
async fn mapped_station_window_closure_succeeds_and_is_not_dead_lettered() {
    let now = support::fixed_point(2026, 2, 1, 0);
    let (state, _clock, _fakes) = support::build_state(now, vec![]).await;
    let conn = state.db.connection().unwrap();
    mapping::upsert(
        &conn,
        &PointMapping {
            station_id: STATION.into(),
            device_id: None,
            point_key: "charge".into(),
            semantic: Semantic::ChargePowerKw,
            unit: "kW".into(),
            factor: 1.0,
        },
    )
    .await
    .unwrap();

    AnalyticsService::close_window(&state, TENANT, STATION, now, now + chrono::Duration::hours(1), false, now)
        .await
        .unwrap();

    let processed = OutboxDispatcher::tick(&state).await.unwrap();
    assert_eq!(processed, 1);
    assert!(outbox::list_dead_letters(&conn).await.unwrap().is_empty());
}
