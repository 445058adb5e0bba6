use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::server::AppState;

/// Build the axum router with all deptrack endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health))
        .route("/v1/info", get(handler::info))
        .route("/v1/sources", get(handler::list_sources))
        .route("/v1/sources/track", post(handler::track_source))
        .route("/v1/modules", get(handler::list_modules))
        .route("/v1/modules/sources", get(handler::module_sources))
        .route("/v1/modules/managed", get(handler::source_managed_modules))
        .route(
            "/v1/dependencies/:language/:organization/:module",
            get(handler::list_dependencies),
        )
        .route(
            "/v1/dependents/:language/:organization/:module",
            get(handler::list_dependents),
        )
        .route(
            "/v1/topology/dependencies/:language/:organization/:module",
            get(handler::dependencies_topology),
        )
        .route(
            "/v1/topology/dependencies/:language/:organization/:module/tiered",
            get(handler::dependencies_topology_tiered),
        )
        .route(
            "/v1/topology/dependents/:language/:organization/:module",
            get(handler::dependents_topology),
        )
        .route(
            "/v1/topology/dependents/:language/:organization/:module/tiered",
            get(handler::dependents_topology_tiered),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
