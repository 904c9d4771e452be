// [apps/orchestrator/src/services/ingest.rs]
//! C1/C4: persisting a batch of points and publishing `TelemetryReceived`
//! happen inside one transaction, so a crash between the two never leaves
//! a measurement on disk with no corresponding outbox row (spec.md §4.4).

use chrono::{DateTime, Utc};
use gridforge_domain_events::payload::TelemetryReceived;
use gridforge_domain_events::{DomainEvent, EventEnvelope, PointSample};
use gridforge_domain_telemetry::{Measurement, MeasurementValue, Quality};
use gridforge_infra_db::repositories::{outbox, telemetry};
use tracing::instrument;

use crate::errors::OrchestratorError;
use crate::state::AppState;

pub struct IngestService;

impl IngestService {
    /// Validates every point, upserts it into the telemetry store, and
    /// enqueues a single `TelemetryReceived` event carrying the whole
    /// batch — all inside one `libsql` transaction. `Transaction` derefs
    /// to `Connection`, so the same repository functions the rest of the
    /// orchestrator calls outside a transaction work here unchanged.
    #[instrument(skip(state, points))]
    pub async fn ingest(
        state: &AppState,
        tenant_id: &str,
        station_id: &str,
        device_id: &str,
        points: Vec<PointSample>,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        let measurements: Vec<Measurement> = points
            .iter()
            .map(|p| Measurement {
                tenant_id: tenant_id.to_string(),
                station_id: station_id.to_string(),
                device_id: device_id.to_string(),
                point_key: p.point_key.clone(),
                ts: p.ts,
                value: match &p.value {
                    gridforge_domain_events::PointValue::Numeric(v) => MeasurementValue::Numeric(*v),
                    gridforge_domain_events::PointValue::Text(t) => MeasurementValue::Text(t.clone()),
                },
                quality: Quality::Good,
            })
            .collect();

        for m in &measurements {
            m.validate()?;
        }

        let envelope = EventEnvelope::new(
            DomainEvent::TelemetryReceived(TelemetryReceived {
                tenant_id: tenant_id.to_string(),
                station_id: station_id.to_string(),
                device_id: device_id.to_string(),
                points,
                occurred_at: now,
            }),
            None,
            now,
        );
        let raw = envelope.to_raw()?;

        let conn = state.db.connection()?;
        let tx = conn.transaction().await.map_err(gridforge_infra_db::DbError::Query)?;

        for m in &measurements {
            telemetry::upsert_measurement(&tx, m, now).await?;
        }
        outbox::insert(&tx, &raw, now).await?;

        tx.commit().await.map_err(gridforge_infra_db::DbError::Query)?;
        Ok(())
    }
}
