pub mod response;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::compression::CompressionLayer;

use crate::config::CorsConfig;
use crate::features::{self, FeatureState};
use crate::ingest::LinkStore;
use crate::middleware;

/// Routes under `/api/v1` plus the unauthenticated `/health` check
pub fn create_router(state: FeatureState, cors: &CorsConfig) -> Router {
    let store = state.ingestor.store().clone();

    Router::new()
        .route("/health", get(health))
        .with_state(store)
        .nest("/api/v1", features::router(state))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn health(State(store): State<Arc<dyn LinkStore>>) -> Response {
    let (status, database) = match store.ping().await {
        Ok(()) => (StatusCode::OK, "connected"),
        Err(e) => {
            tracing::error!(error = %e, "Health check could not reach the link store");
            (StatusCode::SERVICE_UNAVAILABLE, "unreachable")
        },
    };
    let healthy = status == StatusCode::OK;

    (
        status,
        Json(json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "database": database,
        })),
    )
        .into_response()
}
