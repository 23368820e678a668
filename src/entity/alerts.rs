use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{AlertStatus, AlertType, Severity};

/// `sensor_from == sensor_to` for single-sensor alerts (low battery).
/// `alerts_active_dedup_idx` bounds the table to one active row per
/// (sensor_from, sensor_to, alert_type).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sensor_from: String,
    pub sensor_to: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub probability: f64,
    pub time: DateTimeWithTimeZone,
    pub status: AlertStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sensors::Entity",
        from = "Column::SensorFrom",
        to = "super::sensors::Column::Id"
    )]
    SourceSensor,
    #[sea_orm(
        belongs_to = "super::sensors::Entity",
        from = "Column::SensorTo",
        to = "super::sensors::Column::Id"
    )]
    DestinationSensor,
}

impl ActiveModelBehavior for ActiveModel {}
