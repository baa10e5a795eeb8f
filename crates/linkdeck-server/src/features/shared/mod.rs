//! Helpers shared across feature slices

pub mod validation;

pub use validation::{allowed_extension, secure_filename, validate_upload_filename, FilenameValidationError};
