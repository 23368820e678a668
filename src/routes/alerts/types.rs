use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::alerts;
use crate::entity::enums::{AlertStatus, AlertType, Severity};

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertResponse {
    pub alert_id: i64,
    pub sensor_from: String,
    pub sensor_to: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub probability: f64,
    pub timestamp: DateTime<Utc>,
    pub status: AlertStatus,
}

impl From<alerts::Model> for AlertResponse {
    fn from(model: alerts::Model) -> Self {
        Self {
            alert_id: model.id,
            sensor_from: model.sensor_from,
            sensor_to: model.sensor_to,
            alert_type: model.alert_type,
            severity: model.severity,
            probability: model.probability,
            timestamp: model.time.to_utc(),
            status: model.status,
        }
    }
}

pub fn default_format() -> String {
    "json".to_string()
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AlertsQuery {
    /// Filter by lifecycle status
    pub status: Option<AlertStatus>,
    /// Match either endpoint of the alert
    pub sensor: Option<String>,
    /// Filter by alert type
    pub alert_type: Option<AlertType>,
    /// Filter by severity
    pub severity: Option<Severity>,
    /// Response format: json (default) or csv
    #[serde(default = "default_format")]
    pub format: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkResolveRequest {
    pub alert_ids: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveResponse {
    /// Rows that actually transitioned active -> resolved
    pub resolved: u64,
}
