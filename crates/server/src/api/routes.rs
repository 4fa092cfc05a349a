use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{handlers, torznab};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Indexer endpoints, behind the API key
    let torznab_routes = Router::new()
        .route("/api", get(torznab::api))
        .route("/download", get(torznab::download))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(torznab_routes)
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
