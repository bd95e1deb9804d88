use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::models::AppState;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/fleet", get(handlers::fleet::fleet_get))
        .route("/fleet/principal", post(handlers::fleet::principal_post))
        .route("/fleet/accelerators", post(handlers::fleet::accelerators_post))
        .route("/fleet/instances/:instance_id", delete(handlers::fleet::instance_delete))
        .route("/fleet/refresh", post(handlers::fleet::refresh_post))
        .route("/fleet/error/dismiss", post(handlers::fleet::error_dismiss_post))
        .route("/fleet/events", get(handlers::events::events_stream))
        .route("/catalog", get(handlers::catalog::catalog_get));

    Router::new()
        .route("/health", get(handlers::system::health_get))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
