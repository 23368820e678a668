use std::collections::BTreeSet;

use axum::{extract::State, Json};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::{AppState, TOPOLOGY_CACHE_KEY};
use crate::engine::{Edge, Topology};
use crate::entity::{sensors, topology_edges};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopologyEdgeBody {
    pub parent_sensor_id: String,
    pub child_sensor_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopologyResponse {
    pub edges: Vec<TopologyEdgeBody>,
    /// Sensors appearing as a child of no edge; traversal start points
    pub roots: Vec<String>,
}

/// Current pipe topology
#[utoipa::path(
    get,
    path = "/api/topology",
    responses(
        (status = 200, description = "Topology retrieved successfully", body = TopologyResponse),
    ),
    tag = "topology"
)]
pub async fn get_topology(State(state): State<AppState>) -> AppResult<Json<TopologyResponse>> {
    let rows = topology_edges::Entity::find().all(&state.db).await?;

    let edges: Vec<Edge> = rows
        .iter()
        .map(|r| Edge::new(r.parent_id.clone(), r.child_id.clone()))
        .collect();
    let topology = Topology::from_edges(&edges)?;

    Ok(Json(TopologyResponse {
        edges: rows
            .into_iter()
            .map(|r| TopologyEdgeBody {
                parent_sensor_id: r.parent_id,
                child_sensor_id: r.child_id,
            })
            .collect(),
        roots: topology.roots().to_vec(),
    }))
}

/// Replace the pipe topology
///
/// The submitted edge set must reference registered sensors and form a
/// forest; it is validated before the previous edges are touched.
#[utoipa::path(
    put,
    path = "/api/topology",
    request_body = Vec<TopologyEdgeBody>,
    responses(
        (status = 200, description = "Topology replaced", body = TopologyResponse),
        (status = 400, description = "Unknown sensor, cycle, or multi-parent node"),
    ),
    tag = "topology"
)]
pub async fn replace_topology(
    State(state): State<AppState>,
    Json(body): Json<Vec<TopologyEdgeBody>>,
) -> AppResult<Json<TopologyResponse>> {
    let referenced: BTreeSet<&str> = body
        .iter()
        .flat_map(|e| [e.parent_sensor_id.as_str(), e.child_sensor_id.as_str()])
        .collect();

    let known: BTreeSet<String> = sensors::Entity::find()
        .filter(sensors::Column::Id.is_in(referenced.iter().copied()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    let unknown: Vec<&str> = referenced
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

    let edges: Vec<Edge> = body
        .iter()
        .map(|e| Edge::new(e.parent_sensor_id.clone(), e.child_sensor_id.clone()))
        .collect();
    // Fail fast on cycles and multi-parent nodes before any write
    let topology = Topology::from_edges(&edges)?;

    // Duplicate submissions collapse to one row (composite primary key)
    let unique_edges: BTreeSet<(&str, &str)> = edges
        .iter()
        .map(|e| (e.parent_id.as_str(), e.child_id.as_str()))
        .collect();

    let txn = state.db.begin().await?;
    topology_edges::Entity::delete_many().exec(&txn).await?;
    if !unique_edges.is_empty() {
        topology_edges::Entity::insert_many(unique_edges.iter().map(|(parent, child)| {
            topology_edges::ActiveModel {
                parent_id: Set((*parent).to_string()),
                child_id: Set((*child).to_string()),
            }
        }))
        .exec(&txn)
        .await?;
    }
    txn.commit().await?;

    state.topology_cache.invalidate(&TOPOLOGY_CACHE_KEY).await;

    tracing::info!(
        edges = edges.len(),
        roots = topology.roots().len(),
        "Topology replaced"
    );

    Ok(Json(TopologyResponse {
        edges: body,
        roots: topology.roots().to_vec(),
    }))
}
