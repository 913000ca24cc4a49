use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, middleware::metrics_middleware, policy, searcher, suppressed};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Ad-hoc indexer search
        .route("/search", post(searcher::search))
        // Release policy state
        .route("/policy", get(policy::get_policy))
        .route("/policy/upgrades/{key}", delete(policy::remove_upgrade))
        // Retry tracker
        .route("/suppressed", get(suppressed::list_suppressed))
        .route("/suppressed/{key}", delete(suppressed::unsuppress))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
