//! JSON envelopes shared by every route
//!
//! ```text
//! { "success": true,  "data": ..., "meta": ... }
//! { "success": false, "error": { "code": "...", "message": "...", "details": ... } }
//! ```
//!
//! Error codes are stable identifiers clients switch on (`EMPTY_FILE`,
//! `VALIDATION_FAILURE`, ...); messages are for humans.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
        }
    }

    /// Success with listing metadata such as totals
    pub fn success_with_meta(data: T, meta: Value) -> Self {
        Self {
            meta: Some(meta),
            ..Self::success(data)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    /// Validation messages, allowed formats or a support reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(code: impl Into<String>, message: impl Into<String>, details: Value) -> Self {
        let mut response = Self::new(code, message);
        response.error.details = Some(details);
        response
    }
}
