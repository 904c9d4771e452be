//! Drives the full ingest -> window closure -> hour/day rollup -> day
//! settlement chain through the real outbox dispatcher, covering spec.md
//! S1 (a complete 24-hour day) and S2 (a backfilled hour bumping the
//! settlement version without re-emitting by default).

#[path = "support.rs"]
mod support;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use gridforge_domain_events::{Granularity, PointSample, PointValue};
use gridforge_domain_settlement::{TariffPlan, TariffRule};
use gridforge_domain_telemetry::{PointMapping, Semantic};
use gridforge_infra_db::repositories::{analytics, mapping, settlement};
use gridforge_orchestrator::services::analytics::AnalyticsService;
use gridforge_orchestrator::services::ingest::IngestService;
use gridforge_orchestrator::state::AppState;

const TENANT: &str = "t1";
const STATION: &str = "s1";
const DEVICE: &str = "d1";

async fn seed_fixtures(state: &AppState, day_start: DateTime<Utc>) {
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
    mapping::upsert(
        &conn,
        &PointMapping {
            station_id: STATION.into(),
            device_id: None,
            point_key: "discharge".into(),
            semantic: Semantic::DischargePowerKw,
            unit: "kW".into(),
            factor: 1.0,
        },
    )
    .await
    .unwrap();

    let month_start = Utc.with_ymd_and_hms(day_start.year(), day_start.month(), 1, 0, 0, 0).unwrap();
    settlement::upsert_tariff_plan(
        &conn,
        TENANT,
        STATION,
        month_start,
        &TariffPlan {
            currency: "CNY".into(),
            rules: vec![TariffRule {
                start_minute: 0,
                end_minute: 1440,
                price_per_kwh: 1.0,
            }],
            fallback_price: None,
        },
    )
    .await
    .unwrap();
}

async fn ingest_hour(state: &AppState, hour_start: DateTime<Utc>, charge_kw: f64, discharge_kw: f64, recalculate: bool) {
    IngestService::ingest(
        state,
        TENANT,
        STATION,
        DEVICE,
        vec![
            PointSample {
                point_key: "charge".into(),
                ts: hour_start,
                value: PointValue::Numeric(charge_kw),
            },
            PointSample {
                point_key: "discharge".into(),
                ts: hour_start,
                value: PointValue::Numeric(discharge_kw),
            },
        ],
        hour_start,
    )
    .await
    .unwrap();

    AnalyticsService::close_window(state, TENANT, STATION, hour_start, hour_start + Duration::hours(1), recalculate, hour_start)
        .await
        .unwrap();
}

#[tokio::test]
async fn scenario_s1_full_day_rolls_up_to_a_settled_day() {
    let day_start = support::fixed_point(2026, 1, 20, 0);
    let (state, _clock, _fakes) = support::build_state(day_start, vec![]).await;
    seed_fixtures(&state, day_start).await;

    for h in 0..24 {
        ingest_hour(&state, day_start + Duration::hours(h), 1.0, 2.0, false).await;
        support::drain_outbox(&state).await;
    }

    let conn = state.db.connection().unwrap();
    let day_aggregate = analytics::load(&conn, STATION, Granularity::Day, day_start)
        .await
        .unwrap()
        .expect("day aggregate exists");
    assert!(day_aggregate.is_completed);
    assert_eq!(day_aggregate.fact.charge_kwh, 24.0);
    assert_eq!(day_aggregate.fact.discharge_kwh, 48.0);

    let day_settlement = settlement::load_day_settlement(&conn, TENANT, STATION, day_start)
        .await
        .unwrap()
        .expect("day settlement exists");
    assert_eq!(day_settlement.energy_kwh, 72.0);
    assert_eq!(day_settlement.amount, 72.0);
    assert_eq!(day_settlement.version, 1);
}

#[tokio::test]
async fn scenario_s2_backfilled_hour_bumps_version_without_reemitting() {
    let day_start = support::fixed_point(2026, 1, 20, 0);
    let (state, _clock, _fakes) = support::build_state(day_start, vec![]).await;
    seed_fixtures(&state, day_start).await;

    for h in 0..24 {
        ingest_hour(&state, day_start + Duration::hours(h), 1.0, 2.0, false).await;
        support::drain_outbox(&state).await;
    }

    // Backfill hour 6: charge/discharge jump from 1/2 kWh to 10/20 kWh,
    // bumping the day's energy by 27 (72 -> 99).
    ingest_hour(&state, day_start + Duration::hours(6), 10.0, 20.0, true).await;
    support::drain_outbox(&state).await;

    let conn = state.db.connection().unwrap();
    let day_aggregate = analytics::load(&conn, STATION, Granularity::Day, day_start)
        .await
        .unwrap()
        .expect("day aggregate exists");
    assert_eq!(day_aggregate.fact.charge_kwh, 33.0);
    assert_eq!(day_aggregate.fact.discharge_kwh, 66.0);

    let day_settlement = settlement::load_day_settlement(&conn, TENANT, STATION, day_start)
        .await
        .unwrap()
        .expect("day settlement exists");
    assert_eq!(day_settlement.energy_kwh, 99.0);
    assert_eq!(day_settlement.amount, 99.0);
    assert_eq!(day_settlement.version, 2);
}
