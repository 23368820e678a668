use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::SensorStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sensors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub location: Option<String>,
    pub pipe_diameter_mm: Option<i32>,
    pub install_date: Option<Date>,
    pub status: SensorStatus,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::readings::Entity")]
    Readings,
    #[sea_orm(has_many = "super::processed_readings::Entity")]
    ProcessedReadings,
}

impl Related<super::readings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Readings.def()
    }
}

impl Related<super::processed_readings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProcessedReadings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
