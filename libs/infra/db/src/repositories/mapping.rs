// [libs/infra/db/src/repositories/mapping.rs]
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use gridforge_domain_telemetry::{PointMapping, Semantic};
use libsql::{params, Connection};
use tracing::instrument;

use crate::errors::DbError;

fn semantic_str(semantic: Semantic) -> &'static str {
    semantic.as_str()
}

#[instrument(skip(conn))]
pub async fn load_for_station(conn: &Connection, station_id: &str) -> Result<Vec<PointMapping>, DbError> {
    let mut rows = conn
        .query(
            "SELECT station_id, device_id, point_key, semantic, unit, factor FROM point_mappings WHERE station_id = ?1",
            params![station_id.to_string()],
        )
        .await
        .map_err(DbError::Query)?;

    let mut mappings = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::Query)? {
        let station_id: String = row.get(0).map_err(DbError::Query)?;
        let device_id: Option<String> = row.get(1).map_err(DbError::Query)?;
        let point_key: String = row.get(2).map_err(DbError::Query)?;
        let semantic_raw: String = row.get(3).map_err(DbError::Query)?;
        let unit: String = row.get(4).map_err(DbError::Query)?;
        let factor: f64 = row.get(5).map_err(DbError::Query)?;
        let semantic = Semantic::from_str(&semantic_raw).ok_or_else(|| DbError::Mapping(format!("unknown semantic '{semantic_raw}'")))?;
        mappings.push(PointMapping {
            station_id,
            device_id,
            point_key,
            semantic,
            unit,
            factor,
        });
    }
    Ok(mappings)
}

#[instrument(skip(conn, mapping))]
pub async fn upsert(conn: &Connection, mapping: &PointMapping) -> Result<(), DbError> {
    mapping.validate().map_err(|e| DbError::Mapping(e.to_string()))?;
    conn.execute(
        r#"
        INSERT INTO point_mappings (station_id, device_id, point_key, semantic, unit, factor)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (station_id, device_id, point_key)
        DO UPDATE SET semantic = excluded.semantic, unit = excluded.unit, factor = excluded.factor
        "#,
        params![
            mapping.station_id.clone(),
            mapping.device_id.clone(),
            mapping.point_key.clone(),
            semantic_str(mapping.semantic).to_string(),
            mapping.unit.clone(),
            mapping.factor
        ],
    )
    .await
    .map_err(DbError::Query)?;
    Ok(())
}

/// Per-process TTL cache over `load_for_station`; a stale snapshot for up
/// to one tick is acceptable (spec.md §5 "Shared-resource policy").
pub struct MappingCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Vec<PointMapping>, Instant)>>,
}

impl MappingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, conn: &Connection, station_id: &str) -> Result<Vec<PointMapping>, DbError> {
        if let Some((mappings, fetched_at)) = self.entries.lock().expect("mapping cache mutex poisoned").get(station_id) {
            if fetched_at.elapsed() < self.ttl {
                return Ok(mappings.clone());
            }
        }
        let mappings = load_for_station(conn, station_id).await?;
        self.entries
            .lock()
            .expect("mapping cache mutex poisoned")
            .insert(station_id.to_string(), (mappings.clone(), Instant::now()));
        Ok(mappings)
    }

    pub fn invalidate(&self, station_id: &str) {
        self.entries.lock().expect("mapping cache mutex poisoned").remove(station_id);
    }
}
