//! S6: the shadow-reconciliation job recomputes each day of a statement
//! month independently from its hour aggregates and diffs it against the
//! recorded `DaySettlement`. A tariff/settlement mismatch with matching
//! energy recommends `CheckTariffOrSettlement` (spec.md §4.11 step 6),
//! grounded on the domain-level `scenario_s6_large_amount_diff_recommends_tariff_check`
//! fixture: 24 complete hours of charge=1.0/discharge=2.0 kWh recompute to
//! 72.0 energy/72.0 amount, but the recorded settlement says 162.0.

#[path = "../support.rs"]
mod support;

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use gridforge_domain_analytics::{build_hour_aggregate, StatisticFact};
use gridforge_domain_settlement::{DaySettlement, SettlementStatus, TariffPlan, TariffRule};
use gridforge_domain_shadowrun::RecommendedAction;
use gridforge_infra_db::repositories::{analytics, settlement, shadowrun};
use gridforge_orchestrator::services::shadowrun::ShadowRunService;
use libsql::params;

const TENANT: &str = "t1";
const STATION: &str = "s1";

/// The recorded report for (tenant, station, month), read back directly
/// since the `shadowrun` repository only exposes writes — the dlq-tool-style
/// "dump the ledger" read path does not exist yet for shadow reports.
async fn load_latest_report(conn: &libsql::Connection, tenant_id: &str, station_id: &str) -> (f64, f64, i64, RecommendedAction) {
    let mut rows = conn
        .query(
            "SELECT diff_energy_max, diff_amount_max, missing_hours_total, recommended_action FROM shadow_reports WHERE tenant_id = ?1 AND station_id = ?2 ORDER BY created_at DESC LIMIT 1",
            params![tenant_id.to_string(), station_id.to_string()],
        )
        .await
        .unwrap();
    let row = rows.next().await.unwrap().expect("a report was recorded");
    let action_raw: String = row.get(3).unwrap();
    (row.get(0).unwrap(), row.get(1).unwrap(), row.get(2).unwrap(), shadowrun::recommended_action_from_column(&action_raw))
}

async fn count_alerts(conn: &libsql::Connection, tenant_id: &str, station_id: &str) -> i64 {
    let mut rows = conn
        .query(
            "SELECT count(*) FROM shadow_alerts WHERE tenant_id = ?1 AND station_id = ?2",
            params![tenant_id.to_string(), station_id.to_string()],
        )
        .await
        .unwrap();
    rows.next().await.unwrap().unwrap().get(0).unwrap()
}

/// Every day of the month gets a full 24 hours of the fixture fact and a
/// `DaySettlement` that matches it exactly, so only the one day this test
/// tampers with contributes a diff — `recommend()` checks missing hours
/// first, so any other day left incomplete would mask the amount mismatch
/// this test is about.
async fn seed_reconciled_month(conn: &libsql::Connection, month_start: chrono::DateTime<Utc>, month_end: chrono::DateTime<Utc>, now: chrono::DateTime<Utc>) {
    let fact = StatisticFact {
        charge_kwh: 1.0,
        discharge_kwh: 2.0,
        earnings: 0.1,
        carbon_reduction: 0.01,
    };

    let mut day_start = month_start;
    while day_start < month_end {
        for h in 0..24 {
            let hour_start = day_start + chrono::Duration::hours(h);
            let aggregate = build_hour_aggregate(STATION, hour_start, fact, now).unwrap();
            analytics::upsert(conn, &aggregate).await.unwrap();
        }
        settlement::upsert_day_settlement(
            conn,
            &DaySettlement {
                tenant_id: TENANT.to_string(),
                station_id: STATION.to_string(),
                day_start,
                energy_kwh: 72.0,
                amount: 72.0,
                currency: "CNY".to_string(),
                status: SettlementStatus::Calculated,
                version: 1,
            },
        )
        .await
        .unwrap();
        day_start += chrono::Duration::days(1);
    }
}

#[tokio::test]
async fn scenario_s6_amount_mismatch_on_one_day_recommends_checking_tariff_or_settlement() {
    let statement_month = support::fixed_point(2026, 2, 1, 0);
    let now = statement_month;
    let (state, _clock, fakes) = support::build_state(now, vec![]).await;
    let conn = state.db.connection().unwrap();

    let month_end = Utc.with_ymd_and_hms(statement_month.year(), statement_month.month() + 1, 1, 0, 0, 0).unwrap();
    seed_reconciled_month(&conn, statement_month, month_end, now).await;

    settlement::upsert_tariff_plan(
        &conn,
        TENANT,
        STATION,
        statement_month,
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

    // Tamper with day 1's recorded settlement: energy stays right (72.0) but
    // the amount was booked at the wrong rate (162.0 instead of 72.0).
    settlement::upsert_day_settlement(
        &conn,
        &DaySettlement {
            tenant_id: TENANT.to_string(),
            station_id: STATION.to_string(),
            day_start: statement_month,
            energy_kwh: 72.0,
            amount: 162.0,
            currency: "CNY".to_string(),
            status: SettlementStatus::Calculated,
            version: 1,
        },
    )
    .await
    .unwrap();

    let job_date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    ShadowRunService::run(&state, TENANT, STATION, statement_month, job_date).await.unwrap();

    let (diff_energy_max, diff_amount_max, missing_hours_total, recommended_action) = load_latest_report(&conn, TENANT, STATION).await;
    assert_eq!(diff_energy_max, 0.0);
    assert_eq!(diff_amount_max, 90.0);
    assert_eq!(missing_hours_total, 0);
    assert_eq!(recommended_action, RecommendedAction::CheckTariffOrSettlement);

    assert_eq!(count_alerts(&conn, TENANT, STATION).await, 1);

    // One ShadowAlert row, and one webhook call recorded.
    let delivered = fakes.shadowrun_notifier.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].recommended_action, RecommendedAction::CheckTariffOrSettlement);
}

/// Running the same job twice for the same (tenant, station, month,
/// job_date) is the normal "already succeeded, re-run anyway" path, not the
/// re-entrant-while-running rejection `ShadowJob::start` guards against.
#[tokio::test]
async fn scenario_s6_a_fully_reconciled_month_raises_no_alert() {
    let statement_month = support::fixed_point(2026, 2, 1, 0);
    let now = statement_month;
    let (state, _clock, fakes) = support::build_state(now, vec![]).await;
    let conn = state.db.connection().unwrap();

    let month_end = Utc.with_ymd_and_hms(statement_month.year(), statement_month.month() + 1, 1, 0, 0, 0).unwrap();
    seed_reconciled_month(&conn, statement_month, month_end, now).await;

    settlement::upsert_tariff_plan(
        &conn,
        TENANT,
        STATION,
        statement_month,
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

    let job_date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    ShadowRunService::run(&state, TENANT, STATION, statement_month, job_date).await.unwrap();

    let (diff_energy_max, diff_amount_max, missing_hours_total, recommended_action) = load_latest_report(&conn, TENANT, STATION).await;
    assert_eq!(diff_energy_max, 0.0);
    assert_eq!(diff_amount_max, 0.0);
    assert_eq!(missing_hours_total, 0);
    assert_eq!(recommended_action, RecommendedAction::None);
    assert_eq!(count_alerts(&conn, TENANT, STATION).await, 0);
    assert!(fakes.shadowrun_notifier.delivered().is_empty());
}
