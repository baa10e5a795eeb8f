//! Shared validation utilities
//!
//! Upload filename handling used by the upload command.
//!
//! # Examples
//!
//! ```rust,ignore
//! use linkdeck_server::features::shared::validation::{secure_filename, validate_upload_filename};
//!
//! assert_eq!(secure_filename("../../etc/my links.csv").as_deref(), Some("my_links.csv"));
//! validate_upload_filename("links.xlsx")?;
//! ```

use thiserror::Error;

use crate::ingest::reader::SUPPORTED_EXTENSIONS;
use crate::models::MAX_NAME_LENGTH;

/// Errors that can occur during upload filename validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilenameValidationError {
    #[error("No selected file")]
    Required,

    #[error("Filename must not exceed {max_length} characters")]
    TooLong { max_length: usize },

    #[error("Invalid file type. Allowed formats: {}", SUPPORTED_EXTENSIONS.join(", "))]
    UnsupportedExtension,
}

/// Reduce a client-supplied filename to a safe base name
///
/// Directory components are stripped, whitespace becomes `_`, and anything
/// outside ASCII alphanumerics, `.`, `-` and `_` is removed. Returns `None`
/// when nothing usable is left.
pub fn secure_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Lower-cased extension if it is one the reader accepts
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Validate an already sanitized upload filename
pub fn validate_upload_filename(filename: &str) -> Result<(), FilenameValidationError> {
    if filename.trim().is_empty() {
        return Err(FilenameValidationError::Required);
    }

    if filename.chars().count() > MAX_NAME_LENGTH {
        return Err(FilenameValidationError::TooLong {
            max_length: MAX_NAME_LENGTH,
        });
    }

    if allowed_extension(filename).is_none() {
        return Err(FilenameValidationError::UnsupportedExtension);
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename_strips_directories() {
        assert_eq!(secure_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(secure_filename(r"C:\Users\me\links.csv").as_deref(), Some("links.csv"));
    }

    #[test]
    fn test_secure_filename_replaces_unsafe_characters() {
        assert_eq!(secure_filename("my links (v2).xlsx").as_deref(), Some("my_links_v2.xlsx"));
        assert_eq!(secure_filename(".hidden.csv").as_deref(), Some("hidden.csv"));
    }

    #[test]
    fn test_secure_filename_rejects_nothing_left() {
        assert_eq!(secure_filename(""), None);
        assert_eq!(secure_filename("../.."), None);
        assert_eq!(secure_filename("日本語"), None);
    }

    #[test]
    fn test_allowed_extension() {
        assert_eq!(allowed_extension("links.CSV").as_deref(), Some("csv"));
        assert_eq!(allowed_extension("book.xls").as_deref(), Some("xls"));
        assert_eq!(allowed_extension("book.xlsx").as_deref(), Some("xlsx"));
        assert_eq!(allowed_extension("notes.txt"), None);
        assert_eq!(allowed_extension("csv"), None);
        assert_eq!(allowed_extension(".csv"), None);
    }

    #[test]
    fn test_validate_upload_filename() {
        assert!(validate_upload_filename("links.csv").is_ok());
        assert_eq!(validate_upload_filename(""), Err(FilenameValidationError::Required));
        assert_eq!(
            validate_upload_filename("links.pdf"),
            Err(FilenameValidationError::UnsupportedExtension)
        );
        assert_eq!(
            validate_upload_filename(&format!("{}.csv", "a".repeat(300))),
            Err(FilenameValidationError::TooLong { max_length: 255 })
        );
    }
}
