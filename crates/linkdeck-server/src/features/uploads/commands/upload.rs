use std::path::{Path, PathBuf};

use axum::body::Bytes;
use linkdeck_common::UploadStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::features::shared::validation::{secure_filename, validate_upload_filename, FilenameValidationError};
use crate::features::uploads::UploadState;
use crate::ingest::{IngestError, IngestRequest, SheetSummary, StoreError};
use crate::models::QuickStats;

#[derive(Debug, Clone)]
pub struct UploadSpreadsheetCommand {
    pub user_id: i64,
    /// Filename as sent by the client, before sanitizing
    pub filename: String,
    pub content: Bytes,
    /// Caller-chosen id for progress polling
    pub upload_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSpreadsheetResponse {
    pub status: UploadStatus,
    pub message: String,
    pub filename: String,
    pub upload_id: Uuid,
    pub spreadsheet_id: i64,
    pub sheets: Vec<SheetSummary>,
    pub stats: QuickStats,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadSpreadsheetError {
    #[error("No file part")]
    NoFilePart,
    #[error("No selected file")]
    EmptyFile,
    #[error("File exceeds the maximum upload size of {max_bytes} bytes")]
    TooLarge { max_bytes: usize },
    #[error("Invalid file type")]
    InvalidFileType,
    #[error("Filename must not exceed {max_length} characters")]
    FilenameLength { max_length: usize },
    #[error("Failed to store uploaded file: {0}")]
    FileStorage(#[source] std::io::Error),
    #[error("Database connection failed: {0}")]
    DbConnection(#[source] StoreError),
    #[error("Spreadsheet validation failed")]
    Validation(Vec<String>),
    #[error("Failed to save spreadsheet: {0}")]
    DbSave(#[source] IngestError),
    #[error("Unexpected error (reference {reference_id})")]
    System {
        reference_id: Uuid,
        #[source]
        source: IngestError,
    },
}

impl From<FilenameValidationError> for UploadSpreadsheetError {
    fn from(err: FilenameValidationError) -> Self {
        match err {
            FilenameValidationError::Required => Self::EmptyFile,
            FilenameValidationError::TooLong { max_length } => Self::FilenameLength { max_length },
            FilenameValidationError::UnsupportedExtension => Self::InvalidFileType,
        }
    }
}

impl From<IngestError> for UploadSpreadsheetError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(messages) => Self::Validation(messages),
            IngestError::UnsupportedFormat(_) => Self::InvalidFileType,
            err @ (IngestError::Integrity(_) | IngestError::Storage(_)) => Self::DbSave(err),
            err @ IngestError::Unexpected(_) => Self::System {
                reference_id: Uuid::new_v4(),
                source: err,
            },
        }
    }
}

impl UploadSpreadsheetCommand {
    pub fn validate(&self, max_content_length: usize) -> Result<(), UploadSpreadsheetError> {
        if self.filename.trim().is_empty() || self.content.is_empty() {
            return Err(UploadSpreadsheetError::EmptyFile);
        }
        if self.content.len() > max_content_length {
            return Err(UploadSpreadsheetError::TooLarge {
                max_bytes: max_content_length,
            });
        }
        Ok(())
    }

    /// Sanitized filename the spreadsheet is stored under
    pub fn safe_filename(&self) -> Result<String, UploadSpreadsheetError> {
        let name = secure_filename(&self.filename).ok_or(UploadSpreadsheetError::InvalidFileType)?;
        validate_upload_filename(&name)?;
        Ok(name)
    }
}

/// Staged upload on disk, removed when dropped
struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    async fn write(config: &UploadConfig, upload_id: Uuid, filename: &str, content: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&config.dir).await?;
        let path = config.dir.join(format!("{upload_id}_{filename}"));
        tokio::fs::write(&path, content).await?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload");
            }
        }
    }
}

#[tracing::instrument(
    skip(state, command),
    fields(user_id = command.user_id, filename = %command.filename, size = command.content.len())
)]
pub async fn handle(
    state: &UploadState,
    command: UploadSpreadsheetCommand,
) -> Result<UploadSpreadsheetResponse, UploadSpreadsheetError> {
    command.validate(state.upload.max_content_length)?;
    let filename = command.safe_filename()?;
    let upload_id = command.upload_id.unwrap_or_else(Uuid::new_v4);

    let staged = StagedFile::write(&state.upload, upload_id, &filename, &command.content)
        .await
        .map_err(UploadSpreadsheetError::FileStorage)?;

    let store = state.ingestor.store();
    store.ping().await.map_err(UploadSpreadsheetError::DbConnection)?;

    let request = IngestRequest::new(staged.path(), command.user_id)
        .with_upload_id(upload_id)
        .with_display_name(filename.clone());
    let outcome = state.ingestor.ingest(request).await?;
    drop(staged);

    let stats = match store.quick_stats(command.user_id).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!(error = %e, "Quick stats unavailable after upload");
            QuickStats::default()
        },
    };

    let message = match outcome.status {
        UploadStatus::Uploaded => "File processed successfully",
        UploadStatus::Updated => "File updated successfully",
    };

    Ok(UploadSpreadsheetResponse {
        status: outcome.status,
        message: message.to_string(),
        filename,
        upload_id,
        spreadsheet_id: outcome.spreadsheet_id,
        sheets: outcome.sheets,
        stats,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn command(filename: &str, content: &'static [u8]) -> UploadSpreadsheetCommand {
        UploadSpreadsheetCommand {
            user_id: 1,
            filename: filename.to_string(),
            content: Bytes::from_static(content),
            upload_id: None,
        }
    }

    #[test]
    fn test_validation_success() {
        let cmd = command("links.csv", b"title,link,status\n");
        assert!(cmd.validate(1024).is_ok());
        assert_eq!(cmd.safe_filename().unwrap(), "links.csv");
    }

    #[test]
    fn test_validation_empty_filename() {
        assert!(matches!(
            command("  ", b"x").validate(1024),
            Err(UploadSpreadsheetError::EmptyFile)
        ));
    }

    #[test]
    fn test_validation_empty_content() {
        assert!(matches!(
            command("links.csv", b"").validate(1024),
            Err(UploadSpreadsheetError::EmptyFile)
        ));
    }

    #[test]
    fn test_validation_too_large() {
        assert!(matches!(
            command("links.csv", b"0123456789").validate(4),
            Err(UploadSpreadsheetError::TooLarge { max_bytes: 4 })
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            command("notes.txt", b"x").safe_filename(),
            Err(UploadSpreadsheetError::InvalidFileType)
        ));
    }

    #[test]
    fn test_filename_is_sanitized() {
        assert_eq!(
            command("../secret dir/My Links.xlsx", b"x").safe_filename().unwrap(),
            "My_Links.xlsx"
        );
    }

    #[test]
    fn test_ingest_errors_are_classified() {
        let validation: UploadSpreadsheetError = IngestError::Validation(vec!["bad".into()]).into();
        let integrity: UploadSpreadsheetError = IngestError::Integrity("dup".into()).into();
        let unexpected: UploadSpreadsheetError = IngestError::Unexpected(anyhow::anyhow!("boom")).into();

        assert!(matches!(validation, UploadSpreadsheetError::Validation(ref m) if m == &["bad"]));
        assert!(matches!(integrity, UploadSpreadsheetError::DbSave(_)));
        assert!(matches!(unexpected, UploadSpreadsheetError::System { .. }));
    }

    #[tokio::test]
    async fn test_staged_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let config = UploadConfig {
            dir: dir.path().join("nested"),
            max_content_length: 1024,
        };

        let staged = StagedFile::write(&config, Uuid::new_v4(), "links.csv", b"a,b\n")
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }
}
