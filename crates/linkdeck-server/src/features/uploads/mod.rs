//! Spreadsheet upload and progress polling

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::uploads_routes;

use crate::config::UploadConfig;
use crate::ingest::{Ingestor, ProgressRegistry};

/// State for upload routes
#[derive(Clone)]
pub struct UploadState {
    pub ingestor: Ingestor,
    /// Registry the ingestor publishes into, read by the progress endpoint
    pub progress: ProgressRegistry,
    pub upload: UploadConfig,
}
