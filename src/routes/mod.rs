pub mod alerts;
pub mod health;
mod rate_limit;
pub mod readings;
pub mod sensors;
pub mod topology;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use sea_orm::EntityTrait;

use rate_limit::FallbackIpKeyExtractor;

use crate::common::{AppState, TOPOLOGY_CACHE_KEY};
use crate::engine::{Edge, Topology};
use crate::entity::topology_edges;
use crate::error::AppResult;

/// Validated topology for the current edge set, via the single-entry
/// cache. Invalidated by topology replacement and sensor deletion, and
/// expires on its own TTL otherwise.
pub async fn current_topology(state: &AppState) -> AppResult<Arc<Topology>> {
    if let Some(topology) = state.topology_cache.get(&TOPOLOGY_CACHE_KEY).await {
        return Ok(topology);
    }

    let rows = topology_edges::Entity::find().all(&state.db).await?;
    let edges: Vec<Edge> = rows
        .into_iter()
        .map(|r| Edge::new(r.parent_id, r.child_id))
        .collect();
    let topology = Arc::new(Topology::from_edges(&edges)?);

    state
        .topology_cache
        .insert(TOPOLOGY_CACHE_KEY, Arc::clone(&topology))
        .await;

    Ok(topology)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        sensors::list_sensors,
        sensors::register_sensor,
        sensors::get_sensor,
        sensors::update_sensor,
        sensors::delete_sensor,
        readings::ingest_readings,
        readings::get_sensor_readings,
        readings::get_sensor_processed,
        topology::get_topology,
        topology::replace_topology,
        alerts::list_alerts,
        alerts::get_alert,
        alerts::resolve_alert,
        alerts::resolve_alerts_bulk,
    ),
    components(
        schemas(
            sensors::SensorResponse,
            sensors::RegisterSensorRequest,
            sensors::UpdateSensorRequest,
            readings::IngestReading,
            readings::IngestResponse,
            readings::ReadingResponse,
            readings::ProcessedReadingResponse,
            topology::TopologyEdgeBody,
            topology::TopologyResponse,
            alerts::AlertResponse,
            alerts::BulkResolveRequest,
            alerts::ResolveResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sensors", description = "Sensor registry"),
        (name = "readings", description = "Ingestion and reading history"),
        (name = "topology", description = "Pipe adjacency forest"),
        (name = "alerts", description = "Leak, anomaly, and battery alerts"),
    ),
    info(
        title = "Aqualert API",
        description = "Leak-inference API for branching water-pipe sensor networks",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
    } else {
        tracing::info!(
            metadata_rate = %format!("{}/s burst {}", config.rate_limit_metadata_per_second, config.rate_limit_metadata_burst),
            data_rate = %format!("{}/s burst {}", config.rate_limit_data_per_second, config.rate_limit_data_burst),
            "Rate limiting configured"
        );
    }

    // Registry, topology, and alert surfaces
    let metadata_routes_base = Router::new()
        .route(
            "/sensors",
            get(sensors::list_sensors).post(sensors::register_sensor),
        )
        .route(
            "/sensors/{sensor_id}",
            get(sensors::get_sensor)
                .put(sensors::update_sensor)
                .delete(sensors::delete_sensor),
        )
        .route(
            "/topology",
            get(topology::get_topology).put(topology::replace_topology),
        )
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/resolve", post(alerts::resolve_alerts_bulk))
        .route("/alerts/{alert_id}", get(alerts::get_alert))
        .route("/alerts/{alert_id}/resolve", post(alerts::resolve_alert));

    // Ingestion and history carry the heavier per-request cost
    let data_routes_base = Router::new()
        .route("/readings", post(readings::ingest_readings))
        .route(
            "/sensors/{sensor_id}/readings",
            get(readings::get_sensor_readings),
        )
        .route(
            "/sensors/{sensor_id}/processed",
            get(readings::get_sensor_processed),
        );

    // Combine API routes, conditionally applying rate limiting
    let api_routes = if config.disable_rate_limiting {
        Router::new()
            .merge(metadata_routes_base)
            .merge(data_routes_base)
    } else {
        let metadata_limiter = GovernorConfigBuilder::default()
            .key_extractor(FallbackIpKeyExtractor)
            .per_second(config.rate_limit_metadata_per_second)
            .burst_size(config.rate_limit_metadata_burst)
            .finish()
            .expect("Failed to create metadata rate limiter");

        let data_limiter = GovernorConfigBuilder::default()
            .key_extractor(FallbackIpKeyExtractor)
            .per_second(config.rate_limit_data_per_second)
            .burst_size(config.rate_limit_data_burst)
            .finish()
            .expect("Failed to create data rate limiter");

        Router::new()
            .merge(metadata_routes_base.layer(GovernorLayer {
                config: Arc::new(metadata_limiter),
            }))
            .merge(data_routes_base.layer(GovernorLayer {
                config: Arc::new(data_limiter),
            }))
    }
    .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB body limit

    // Health check routes (NO rate limiting)
    let health_routes = Router::new().route("/healthz", get(health::healthz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
