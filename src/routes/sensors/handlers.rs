use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set};

use crate::common::{AppState, TOPOLOGY_CACHE_KEY};
use crate::entity::{enums::SensorStatus, sensors};
use crate::error::{AppError, AppResult};

use super::types::{RegisterSensorRequest, SensorResponse, SensorsQuery, UpdateSensorRequest};

/// Register a new sensor
#[utoipa::path(
    post,
    path = "/api/sensors",
    request_body = RegisterSensorRequest,
    responses(
        (status = 201, description = "Sensor registered", body = SensorResponse),
        (status = 409, description = "Sensor id already registered"),
    ),
    tag = "sensors"
)]
pub async fn register_sensor(
    State(state): State<AppState>,
    Json(body): Json<RegisterSensorRequest>,
) -> AppResult<(StatusCode, Json<SensorResponse>)> {
    if body.sensor_id.is_empty() || body.sensor_id.len() > 50 {
        return Err(AppError::BadRequest(
            "sensor_id must be 1-50 characters".to_string(),
        ));
    }

    let existing = sensors::Entity::find_by_id(&body.sensor_id)
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(format!(
            "Sensor '{}' already registered",
            body.sensor_id
        )));
    }

    let now = Utc::now();
    let model = sensors::ActiveModel {
        id: Set(body.sensor_id),
        location: Set(body.location),
        pipe_diameter_mm: Set(body.pipe_diameter_mm),
        install_date: Set(body.install_date),
        status: Set(body.status.unwrap_or(SensorStatus::Active)),
        created_at: Set(Some(now.into())),
        updated_at: Set(None),
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(model.into())))
}

/// List sensors
#[utoipa::path(
    get,
    path = "/api/sensors",
    params(SensorsQuery),
    responses(
        (status = 200, description = "Sensors retrieved successfully", body = Vec<SensorResponse>),
    ),
    tag = "sensors"
)]
pub async fn list_sensors(
    State(state): State<AppState>,
    Query(query): Query<SensorsQuery>,
) -> AppResult<Json<Vec<SensorResponse>>> {
    let mut db_query = sensors::Entity::find();

    if let Some(status) = query.status {
        db_query = db_query.filter(sensors::Column::Status.eq(status));
    }

    let sensors_list = db_query
        .order_by_asc(sensors::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(sensors_list.into_iter().map(Into::into).collect()))
}

/// Get a sensor by id
#[utoipa::path(
    get,
    path = "/api/sensors/{sensor_id}",
    params(
        ("sensor_id" = String, Path, description = "Sensor identifier"),
    ),
    responses(
        (status = 200, description = "Sensor retrieved successfully", body = SensorResponse),
        (status = 404, description = "Sensor not found"),
    ),
    tag = "sensors"
)]
pub async fn get_sensor(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
) -> AppResult<Json<SensorResponse>> {
    let sensor = find_sensor(&state, &sensor_id).await?;
    Ok(Json(sensor.into()))
}

/// Update sensor attributes; only provided fields change
#[utoipa::path(
    put,
    path = "/api/sensors/{sensor_id}",
    params(
        ("sensor_id" = String, Path, description = "Sensor identifier"),
    ),
    request_body = UpdateSensorRequest,
    responses(
        (status = 200, description = "Sensor updated", body = SensorResponse),
        (status = 404, description = "Sensor not found"),
    ),
    tag = "sensors"
)]
pub async fn update_sensor(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
    Json(body): Json<UpdateSensorRequest>,
) -> AppResult<Json<SensorResponse>> {
    let sensor = find_sensor(&state, &sensor_id).await?;

    let mut model = sensor.into_active_model();
    if let Some(location) = body.location {
        model.location = Set(Some(location));
    }
    if let Some(diameter) = body.pipe_diameter_mm {
        model.pipe_diameter_mm = Set(Some(diameter));
    }
    if let Some(install_date) = body.install_date {
        model.install_date = Set(Some(install_date));
    }
    if let Some(status) = body.status {
        model.status = Set(status);
    }
    model.updated_at = Set(Some(Utc::now().into()));

    let updated = model.update(&state.db).await?;
    Ok(Json(updated.into()))
}

/// Delete a sensor and everything that references it
///
/// Readings, processed rows, alerts, and topology edges go with the
/// sensor (FK cascades).
#[utoipa::path(
    delete,
    path = "/api/sensors/{sensor_id}",
    params(
        ("sensor_id" = String, Path, description = "Sensor identifier"),
    ),
    responses(
        (status = 204, description = "Sensor deleted"),
        (status = 404, description = "Sensor not found"),
    ),
    tag = "sensors"
)]
pub async fn delete_sensor(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
) -> AppResult<StatusCode> {
    let sensor = find_sensor(&state, &sensor_id).await?;
    sensors::Entity::delete_by_id(sensor.id)
        .exec(&state.db)
        .await?;

    // The cascade may have removed topology edges
    state.topology_cache.invalidate(&TOPOLOGY_CACHE_KEY).await;

    tracing::info!(sensor_id = %sensor_id, "Sensor deleted with dependent data");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_sensor(state: &AppState, sensor_id: &str) -> AppResult<sensors::Model> {
    sensors::Entity::find_by_id(sensor_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Sensor '{sensor_id}' not found")))
}
