//! Failure classes of an ingestion run
//!
//! Every variant aborts the run and rolls back its unit of work.

use thiserror::Error;

use super::cleaner::CleanError;
use super::reader::ReadError;
use super::store::StoreError;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Extension is not csv, xls or xlsx
    #[error("Unsupported file format: '{0}'")]
    UnsupportedFormat(String),

    /// Structural problems, one message per offending sheet
    #[error("{}", .0.join("\n"))]
    Validation(Vec<String>),

    /// A persistence constraint rejected the data
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Database failure that is not a constraint violation
    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),

    #[error("Unexpected error: {0:#}")]
    Unexpected(anyhow::Error),
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::UnsupportedFormat(_) => "unsupported_format",
            IngestError::Validation(_) => "validation",
            IngestError::Integrity(_) => "integrity",
            IngestError::Storage(_) => "storage",
            IngestError::Unexpected(_) => "unexpected",
        }
    }

    /// Validation messages, empty for every other class
    pub fn messages(&self) -> &[String] {
        match self {
            IngestError::Validation(messages) => messages,
            _ => &[],
        }
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Integrity(message) => IngestError::Integrity(message),
            other => IngestError::Storage(other),
        }
    }
}

impl From<ReadError> for IngestError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::UnsupportedFormat(name) => IngestError::UnsupportedFormat(name),
            other => IngestError::Unexpected(anyhow::Error::new(other).context("Failed to parse upload")),
        }
    }
}

impl From<CleanError> for IngestError {
    fn from(err: CleanError) -> Self {
        IngestError::Unexpected(anyhow::Error::new(err))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_joins_lines() {
        let err = IngestError::Validation(vec![
            "Sheet 'A' missing required columns: link".to_string(),
            "Sheet 'B' missing required columns: status".to_string(),
        ]);

        assert_eq!(
            err.to_string(),
            "Sheet 'A' missing required columns: link\nSheet 'B' missing required columns: status"
        );
        assert_eq!(err.messages().len(), 2);
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_store_errors_are_classified() {
        let integrity: IngestError = StoreError::Integrity("duplicate key".to_string()).into();
        let unavailable: IngestError = StoreError::Unavailable("down".to_string()).into();

        assert!(matches!(integrity, IngestError::Integrity(_)));
        assert!(matches!(unavailable, IngestError::Storage(_)));
    }

    #[test]
    fn test_unsupported_format_from_reader() {
        let err: IngestError = ReadError::UnsupportedFormat("a.txt".to_string()).into();
        assert!(matches!(err, IngestError::UnsupportedFormat(ref n) if n == "a.txt"));
        assert!(err.messages().is_empty());
    }
}
