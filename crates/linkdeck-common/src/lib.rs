//! Linkdeck Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Pieces shared by the linkdeck server and its command-line tools:
//!
//! - **Logging**: subscriber setup driven by `LOG_*` environment variables
//! - **Types**: progress snapshots and upload outcomes as they appear on the wire

pub mod logging;
pub mod types;

pub use types::{ProgressSnapshot, UploadStatus};
