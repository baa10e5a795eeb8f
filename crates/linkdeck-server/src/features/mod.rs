//! Feature modules implementing the linkdeck API
//!
//! Each feature is a vertical slice with its own commands, queries and routes.
//!
//! # Features
//!
//! - **uploads**: Spreadsheet upload, ingestion and progress polling
//! - **dashboard**: Read-only views over ingested spreadsheets
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions

pub mod dashboard;
pub mod shared;
pub mod uploads;

use axum::Router;

use crate::config::UploadConfig;
use crate::ingest::{Ingestor, ProgressRegistry};
use uploads::UploadState;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for dashboard queries
    pub db: sqlx::PgPool,
    /// Ingestion pipeline used by uploads
    pub ingestor: Ingestor,
    /// Progress registry the ingestor publishes into
    pub progress: ProgressRegistry,
    pub upload: UploadConfig,
}

/// Creates the main API router with all feature routes mounted
///
/// - `/uploads` - Upload and progress
/// - `/dashboard` - Dashboard views
pub fn router(state: FeatureState) -> Router<()> {
    let max_content_length = state.upload.max_content_length;
    let upload_state = UploadState {
        ingestor: state.ingestor,
        progress: state.progress,
        upload: state.upload,
    };

    Router::new()
        .nest(
            "/uploads",
            uploads::uploads_routes(max_content_length).with_state(upload_state),
        )
        .nest("/dashboard", dashboard::dashboard_routes().with_state(state.db))
}
