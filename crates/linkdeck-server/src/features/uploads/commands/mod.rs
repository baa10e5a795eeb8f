pub mod upload;

pub use upload::{UploadSpreadsheetCommand, UploadSpreadsheetError, UploadSpreadsheetResponse};
