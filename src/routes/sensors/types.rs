use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::enums::SensorStatus;
use crate::entity::sensors;

#[derive(Debug, Serialize, ToSchema)]
pub struct SensorResponse {
    pub sensor_id: String,
    pub location: Option<String>,
    pub pipe_diameter_mm: Option<i32>,
    pub install_date: Option<NaiveDate>,
    pub status: SensorStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<sensors::Model> for SensorResponse {
    fn from(model: sensors::Model) -> Self {
        Self {
            sensor_id: model.id,
            location: model.location,
            pipe_diameter_mm: model.pipe_diameter_mm,
            install_date: model.install_date,
            status: model.status,
            created_at: model.created_at.map(|t| t.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterSensorRequest {
    pub sensor_id: String,
    pub location: Option<String>,
    pub pipe_diameter_mm: Option<i32>,
    pub install_date: Option<NaiveDate>,
    /// Defaults to `active`
    pub status: Option<SensorStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSensorRequest {
    pub location: Option<String>,
    pub pipe_diameter_mm: Option<i32>,
    pub install_date: Option<NaiveDate>,
    pub status: Option<SensorStatus>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SensorsQuery {
    /// Filter by operational status
    pub status: Option<SensorStatus>,
}
