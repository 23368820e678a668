use std::collections::BTreeSet;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::AppState;
use crate::engine::IncomingReading;
use crate::entity::{processed_readings, readings, sensors};
use crate::error::{AppError, AppResult};
use crate::routes::current_topology;
use crate::store::DbStore;

/// One reading of an ingestion batch.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestReading {
    pub sensor_id: String,
    pub flow_rate: f64,
    /// Percentage in [0, 100]; defaults to 100 when the sensor omits it
    pub battery_level: Option<i16>,
    /// Defaults to ingestion time
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub readings_stored: usize,
    pub sensors_visited: usize,
    pub edges_scored: usize,
    pub alerts_created: usize,
    pub alerts_deduplicated: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingResponse {
    pub id: i64,
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub flow_rate: f64,
    pub battery_level: i16,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessedReadingResponse {
    pub id: i64,
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub smoothed_flow: f64,
    pub flow_delta: f64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Rows to return, newest first (default 50, max 1000)
    pub limit: Option<u64>,
}

impl HistoryQuery {
    fn effective_limit(&self) -> u64 {
        self.limit.unwrap_or(50).clamp(1, 1000)
    }
}

/// Ingest a batch of sensor readings and run one inference pass
///
/// Raw readings, derived smoothing rows, and the alert batch of the pass
/// commit in a single transaction. Batches touching the same sub-tree are
/// serialized; unrelated sub-trees process in parallel.
#[utoipa::path(
    post,
    path = "/api/readings",
    request_body = Vec<IngestReading>,
    responses(
        (status = 200, description = "Batch ingested", body = IngestResponse),
        (status = 400, description = "Unknown sensor id in batch or invalid topology"),
    ),
    tag = "readings"
)]
pub async fn ingest_readings(
    State(state): State<AppState>,
    Json(batch): Json<Vec<IngestReading>>,
) -> AppResult<Json<IngestResponse>> {
    if batch.is_empty() {
        return Ok(Json(IngestResponse {
            readings_stored: 0,
            sensors_visited: 0,
            edges_scored: 0,
            alerts_created: 0,
            alerts_deduplicated: 0,
        }));
    }

    let batch_sensors: BTreeSet<&str> = batch.iter().map(|r| r.sensor_id.as_str()).collect();

    // Whole-batch validation before any write
    let known: BTreeSet<String> = sensors::Entity::find()
        .filter(sensors::Column::Id.is_in(batch_sensors.iter().copied()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    let unknown: Vec<&str> = batch_sensors
        .iter()
        .copied()
        .filter(|id| !known.contains(*id))
        .collect();
    if !unknown.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Unknown sensors: {}",
            unknown.join(", ")
        )));
    }

    let topology = current_topology(&state).await?;

    // Serialize against other batches touching the same sub-trees. A
    // sensor outside the topology locks under its own id.
    let lock_keys: Vec<String> = batch_sensors
        .iter()
        .map(|id| topology.root_of(id).unwrap_or(id).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let _guards = state.root_locks.acquire(&lock_keys).await;

    let now = Utc::now();
    let incoming: Vec<IncomingReading> = batch
        .iter()
        .map(|r| IncomingReading {
            sensor_id: r.sensor_id.clone(),
            flow_rate: r.flow_rate,
            battery_level: f64::from(r.battery_level.unwrap_or(100).clamp(0, 100)),
            time: r.timestamp.unwrap_or(now),
        })
        .collect();

    let txn = state.db.begin().await?;

    readings::Entity::insert_many(incoming.iter().map(|r| readings::ActiveModel {
        id: NotSet,
        sensor_id: Set(r.sensor_id.clone()),
        time: Set(r.time.into()),
        flow_rate: Set(r.flow_rate),
        battery_level: Set(r.battery_level as i16),
    }))
    .exec(&txn)
    .await?;

    let mut store = DbStore::new(&txn);
    let summary = state
        .engine
        .run_pass(&mut store, &topology, &incoming)
        .await?;

    txn.commit().await?;

    Ok(Json(IngestResponse {
        readings_stored: incoming.len(),
        sensors_visited: summary.sensors_visited,
        edges_scored: summary.edges_scored,
        alerts_created: summary.alerts_created,
        alerts_deduplicated: summary.alerts_deduplicated,
    }))
}

/// Recent raw readings for a sensor
#[utoipa::path(
    get,
    path = "/api/sensors/{sensor_id}/readings",
    params(
        ("sensor_id" = String, Path, description = "Sensor identifier"),
        HistoryQuery,
    ),
    responses(
        (status = 200, description = "Readings retrieved successfully", body = Vec<ReadingResponse>),
        (status = 404, description = "Sensor not found"),
    ),
    tag = "readings"
)]
pub async fn get_sensor_readings(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<ReadingResponse>>> {
    ensure_sensor(&state, &sensor_id).await?;

    let rows = readings::Entity::find()
        .filter(readings::Column::SensorId.eq(&sensor_id))
        .order_by_desc(readings::Column::Time)
        .order_by_desc(readings::Column::Id)
        .limit(query.effective_limit())
        .all(&state.db)
        .await?;

    let response = rows
        .into_iter()
        .map(|r| ReadingResponse {
            id: r.id,
            sensor_id: r.sensor_id,
            timestamp: r.time.to_utc(),
            flow_rate: r.flow_rate,
            battery_level: r.battery_level,
        })
        .collect();

    Ok(Json(response))
}

/// Recent smoothed rows for a sensor
#[utoipa::path(
    get,
    path = "/api/sensors/{sensor_id}/processed",
    params(
        ("sensor_id" = String, Path, description = "Sensor identifier"),
        HistoryQuery,
    ),
    responses(
        (status = 200, description = "Processed readings retrieved successfully", body = Vec<ProcessedReadingResponse>),
        (status = 404, description = "Sensor not found"),
    ),
    tag = "readings"
)]
pub async fn get_sensor_processed(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<ProcessedReadingResponse>>> {
    ensure_sensor(&state, &sensor_id).await?;

    let rows = processed_readings::Entity::find()
        .filter(processed_readings::Column::SensorId.eq(&sensor_id))
        .order_by_desc(processed_readings::Column::Time)
        .order_by_desc(processed_readings::Column::Id)
        .limit(query.effective_limit())
        .all(&state.db)
        .await?;

    let response = rows
        .into_iter()
        .map(|r| ProcessedReadingResponse {
            id: r.id,
            sensor_id: r.sensor_id,
            timestamp: r.time.to_utc(),
            smoothed_flow: r.smoothed_flow,
            flow_delta: r.flow_delta,
        })
        .collect();

    Ok(Json(response))
}

async fn ensure_sensor(state: &AppState, sensor_id: &str) -> AppResult<()> {
    sensors::Entity::find_by_id(sensor_id)
        .one(&state.db)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Sensor '{sensor_id}' not found")))
}
