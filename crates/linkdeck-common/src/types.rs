//! Wire types shared by the server and the import CLI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label reported while no ingestion is running for the caller
pub const IDLE_STATUS: &str = "Not started";

/// Point-in-time view of one running ingestion
///
/// `progress` is a percentage in `0..=100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub status: String,
    pub progress: u8,
    pub current_sheet: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressSnapshot {
    pub fn new(status: impl Into<String>, progress: u8, current_sheet: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            progress: progress.min(100),
            current_sheet: current_sheet.into(),
            timestamp: Utc::now(),
        }
    }

    /// Snapshot returned to pollers when no entry exists
    pub fn idle() -> Self {
        Self::new(IDLE_STATUS, 0, "")
    }
}

/// Outcome of a successful ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// No spreadsheet with that name existed for the user
    Uploaded,
    /// A same-named spreadsheet was replaced or merged into
    Updated,
}

impl UploadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Uploaded => "uploaded",
            UploadStatus::Updated => "updated",
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_clamped() {
        let snapshot = ProgressSnapshot::new("Finalizing", 140, "");
        assert_eq!(snapshot.progress, 100);
    }

    #[test]
    fn test_idle_snapshot() {
        let idle = ProgressSnapshot::idle();
        assert_eq!(idle.status, "Not started");
        assert_eq!(idle.progress, 0);
        assert!(idle.current_sheet.is_empty());
    }

    #[test]
    fn test_upload_status_serializes_lowercase() {
        let json = serde_json::to_string(&UploadStatus::Updated).unwrap_or_default();
        assert_eq!(json, "\"updated\"");
        assert_eq!(UploadStatus::Uploaded.to_string(), "uploaded");
    }
}
