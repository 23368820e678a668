mod handlers;
mod types;

pub use handlers::{get_alert, list_alerts, resolve_alert, resolve_alerts_bulk};
pub use types::{AlertResponse, AlertsQuery, BulkResolveRequest, ResolveResponse};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_get_alert, __path_list_alerts, __path_resolve_alert, __path_resolve_alerts_bulk,
};
