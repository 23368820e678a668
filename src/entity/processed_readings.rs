use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One derived row per incoming reading. `smoothed_flow` follows the
/// recursive smoothing recurrence; `flow_delta` is the change versus the
/// previous smoothed value for the same sensor.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "processed_readings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sensor_id: String,
    pub time: DateTimeWithTimeZone,
    pub smoothed_flow: f64,
    pub flow_delta: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sensors::Entity",
        from = "Column::SensorId",
        to = "super::sensors::Column::Id"
    )]
    Sensor,
}

impl Related<super::sensors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sensor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
