//! HTTP middleware and request identity
//!
//! The server sits behind an authenticating gateway that forwards the user id
//! in [`USER_ID_HEADER`]; [`CurrentUser`] turns it into a typed extractor.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use crate::api::response::ErrorResponse;
use crate::config::CorsConfig;

/// Header carrying the authenticated user id, set by the fronting gateway
pub const USER_ID_HEADER: &str = "x-user-id";

/// Optional header correlating an upload with progress polling
pub const UPLOAD_ID_HEADER: &str = "x-upload-id";

/// CORS policy for the dashboard frontend
///
/// An empty origin list or `*` opens the API to any origin without credentials.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(UPLOAD_ID_HEADER),
        ])
        .max_age(Duration::from_secs(3600));

    if config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);

        // Credentials cannot be combined with a wildcard origin
        if config.allow_credentials {
            cors = cors.allow_credentials(true);
        }
    }

    cors
}

type HttpTraceLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>>;

/// Request spans at INFO; 5xx responses are reported as failures
pub fn tracing_layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO).latency_unit(LatencyUnit::Millis))
}

/// Authenticated user, read from the `x-user-id` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0);

        match user_id {
            Some(id) => Ok(CurrentUser(id)),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("UNAUTHORIZED", "Authentication required")),
            )
                .into_response()),
        }
    }
}
