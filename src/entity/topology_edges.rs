use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Directed parent -> child pipe adjacency. The full edge set must form a
/// forest; `topology_edges_child_idx` backstops the single-parent half of
/// that invariant at the storage layer.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "topology_edges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub parent_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub child_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sensors::Entity",
        from = "Column::ParentId",
        to = "super::sensors::Column::Id"
    )]
    ParentSensor,
    #[sea_orm(
        belongs_to = "super::sensors::Entity",
        from = "Column::ChildId",
        to = "super::sensors::Column::Id"
    )]
    ChildSensor,
}

impl ActiveModelBehavior for ActiveModel {}
