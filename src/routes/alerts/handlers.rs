use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::common::AppState;
use crate::entity::alerts;
use crate::entity::enums::{AlertStatus, AlertType, Severity};
use crate::error::{AppError, AppResult};
use crate::store::{DbStore, EngineStore};

use super::types::{AlertResponse, AlertsQuery, BulkResolveRequest, ResolveResponse};

/// List alerts, newest first
#[utoipa::path(
    get,
    path = "/api/alerts",
    params(AlertsQuery),
    responses(
        (status = 200, description = "Alerts retrieved successfully", body = Vec<AlertResponse>),
    ),
    tag = "alerts"
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> AppResult<Response> {
    let mut db_query = alerts::Entity::find();

    if let Some(status) = query.status {
        db_query = db_query.filter(alerts::Column::Status.eq(status));
    }
    if let Some(alert_type) = query.alert_type {
        db_query = db_query.filter(alerts::Column::AlertType.eq(alert_type));
    }
    if let Some(severity) = query.severity {
        db_query = db_query.filter(alerts::Column::Severity.eq(severity));
    }
    if let Some(ref sensor) = query.sensor {
        db_query = db_query.filter(
            Condition::any()
                .add(alerts::Column::SensorFrom.eq(sensor))
                .add(alerts::Column::SensorTo.eq(sensor)),
        );
    }

    let alerts_list = db_query
        .order_by_desc(alerts::Column::Time)
        .order_by_desc(alerts::Column::Id)
        .all(&state.db)
        .await?;

    let response: Vec<AlertResponse> = alerts_list.into_iter().map(Into::into).collect();

    match query.format.as_str() {
        "csv" => csv_response(&response),
        _ => Ok(Json(response).into_response()),
    }
}

/// Get an alert by id
#[utoipa::path(
    get,
    path = "/api/alerts/{alert_id}",
    params(
        ("alert_id" = i64, Path, description = "Alert id"),
    ),
    responses(
        (status = 200, description = "Alert retrieved successfully", body = AlertResponse),
        (status = 404, description = "Alert not found"),
    ),
    tag = "alerts"
)]
pub async fn get_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<i64>,
) -> AppResult<Json<AlertResponse>> {
    let alert = alerts::Entity::find_by_id(alert_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Alert {alert_id} not found")))?;

    Ok(Json(alert.into()))
}

/// Resolve a single alert
///
/// Resolving an already-resolved alert succeeds with `resolved: 0`.
#[utoipa::path(
    post,
    path = "/api/alerts/{alert_id}/resolve",
    params(
        ("alert_id" = i64, Path, description = "Alert id"),
    ),
    responses(
        (status = 200, description = "Resolution applied", body = ResolveResponse),
        (status = 404, description = "Alert not found"),
    ),
    tag = "alerts"
)]
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<i64>,
) -> AppResult<Json<ResolveResponse>> {
    alerts::Entity::find_by_id(alert_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Alert {alert_id} not found")))?;

    let mut store = DbStore::new(&state.db);
    let resolved = store.resolve_alerts(&[alert_id]).await?;

    Ok(Json(ResolveResponse { resolved }))
}

/// Resolve a set of alerts
///
/// Every matching active row transitions unconditionally; the count only
/// reflects rows that actually changed state.
#[utoipa::path(
    post,
    path = "/api/alerts/resolve",
    request_body = BulkResolveRequest,
    responses(
        (status = 200, description = "Resolution applied", body = ResolveResponse),
    ),
    tag = "alerts"
)]
pub async fn resolve_alerts_bulk(
    State(state): State<AppState>,
    Json(body): Json<BulkResolveRequest>,
) -> AppResult<Json<ResolveResponse>> {
    let mut store = DbStore::new(&state.db);
    let resolved = store.resolve_alerts(&body.alert_ids).await?;

    tracing::info!(
        requested = body.alert_ids.len(),
        resolved,
        "Bulk alert resolution"
    );

    Ok(Json(ResolveResponse { resolved }))
}

/// Flat row shape for the CSV export
#[derive(Serialize)]
struct AlertCsvRow<'a> {
    alert_id: i64,
    sensor_from: &'a str,
    sensor_to: &'a str,
    alert_type: AlertType,
    severity: Severity,
    probability: f64,
    timestamp: String,
    status: AlertStatus,
}

fn csv_response(rows: &[AlertResponse]) -> AppResult<Response> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(AlertCsvRow {
                alert_id: row.alert_id,
                sensor_from: &row.sensor_from,
                sensor_to: &row.sensor_to,
                alert_type: row.alert_type,
                severity: row.severity,
                probability: row.probability,
                timestamp: row.timestamp.to_rfc3339(),
                status: row.status,
            })
            .map_err(|e| AppError::Internal(format!("CSV serialization failed: {e}")))?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV serialization failed: {e}")))?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"))],
        data,
    )
        .into_response())
}
