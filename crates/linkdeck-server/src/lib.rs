//! linkdeck server library
//!
//! Ingests CSV, XLS and XLSX uploads into a per-user
//! Spreadsheet → Sheet → Link hierarchy and serves dashboard views over it.
//!
//! # Overview
//!
//! - **Ingestion**: read, validate, clean and persist uploads in one transaction
//!   ([`ingest`])
//! - **API Endpoints**: upload, progress polling and dashboard ([`features`])
//! - **Database Management**: PostgreSQL integration with SQLx ([`db`])
//! - **Configuration**: Environment-based configuration management ([`config`])
//! - **Middleware**: CORS, request logging, caller identity ([`middleware`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use linkdeck_server::ingest::{IngestConfig, Ingestor, MemoryStore, NoopProgress};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let ingestor = Ingestor::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(NoopProgress),
//!     IngestConfig::default(),
//! );
//! let status = ingestor.ingest_file("links.xlsx".as_ref(), 1).await?;
//! println!("{status}");
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod models;

pub use error::{ApiResult, AppError};
