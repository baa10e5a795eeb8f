//! Upload API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/uploads` - Upload and ingest a spreadsheet
//! - `GET /api/v1/uploads/progress` - Progress of the caller's ingestion

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use super::{
    commands::{UploadSpreadsheetCommand, UploadSpreadsheetError},
    queries::GetProgressQuery,
    UploadState,
};
use crate::api::response::{ApiResponse, ErrorResponse};
use crate::ingest::reader::SUPPORTED_EXTENSIONS;
use crate::middleware::{CurrentUser, UPLOAD_ID_HEADER};

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Creates the uploads router; bodies are capped just above `max_content_length`
pub fn uploads_routes(max_content_length: usize) -> Router<UploadState> {
    Router::new()
        .route(
            "/",
            post(upload_spreadsheet)
                .layer(DefaultBodyLimit::max(max_content_length.saturating_add(MULTIPART_OVERHEAD))),
        )
        .route("/progress", get(get_progress))
}

/// Upload a spreadsheet
///
/// # Endpoint
///
/// `POST /api/v1/uploads` (multipart, field `file`)
///
/// # Response
///
/// - `200 OK` - Spreadsheet uploaded or updated
/// - `400 Bad Request` - Missing file, bad type, or validation failure
/// - `413 Payload Too Large` - File exceeds the configured limit
/// - `503 Service Unavailable` - Database unreachable
/// - `500 Internal Server Error` - Storage, database or unexpected failure
#[tracing::instrument(skip(state, headers, multipart))]
async fn upload_spreadsheet(
    State(state): State<UploadState>,
    CurrentUser(user_id): CurrentUser,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, UploadApiError> {
    let max_bytes = state.upload.max_content_length;
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "Request is not multipart");
        UploadSpreadsheetError::NoFilePart
    })?;

    let mut file: Option<(String, axum::body::Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?;
        file = Some((filename, content));
    }

    let (filename, content) = file.ok_or(UploadSpreadsheetError::NoFilePart)?;

    let command = UploadSpreadsheetCommand {
        user_id,
        filename,
        content,
        upload_id: upload_id_header(&headers),
    };

    let response = super::commands::upload::handle(&state, command).await?;

    tracing::info!(
        upload_id = %response.upload_id,
        spreadsheet_id = response.spreadsheet_id,
        status = %response.status,
        "Spreadsheet ingested via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// Poll ingestion progress
///
/// # Endpoint
///
/// `GET /api/v1/uploads/progress[?upload_id=<uuid>]`
async fn get_progress(
    State(state): State<UploadState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<GetProgressQuery>,
) -> Response {
    let snapshot = super::queries::progress::handle(&state.progress, user_id, query);
    (StatusCode::OK, Json(ApiResponse::success(snapshot))).into_response()
}

fn upload_id_header(headers: &HeaderMap) -> Option<Uuid> {
    let raw = headers.get(UPLOAD_ID_HEADER)?.to_str().ok()?;
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::warn!(value = raw, "Ignoring malformed upload id header");
            None
        },
    }
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> UploadApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadSpreadsheetError::TooLarge { max_bytes }.into();
    }
    tracing::debug!(error = %err, "Malformed multipart body");
    UploadSpreadsheetError::NoFilePart.into()
}

#[derive(Debug)]
struct UploadApiError(UploadSpreadsheetError);

impl From<UploadSpreadsheetError> for UploadApiError {
    fn from(err: UploadSpreadsheetError) -> Self {
        Self(err)
    }
}

impl IntoResponse for UploadApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            UploadSpreadsheetError::NoFilePart => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("NO_FILE_PART", "No file part in the request"),
            ),
            UploadSpreadsheetError::EmptyFile => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("EMPTY_FILE", "No selected file"),
            ),
            err @ UploadSpreadsheetError::TooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorResponse::new("FILE_TOO_LARGE", err.to_string()),
            ),
            err @ (UploadSpreadsheetError::InvalidFileType
            | UploadSpreadsheetError::FilenameLength { .. }) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details(
                    "INVALID_FILE_TYPE",
                    err.to_string(),
                    json!({ "allowed_formats": SUPPORTED_EXTENSIONS }),
                ),
            ),
            UploadSpreadsheetError::FileStorage(ref e) => {
                tracing::error!(error = %e, "Failed to stage upload");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("FILE_STORAGE_FAILURE", "Failed to save the uploaded file"),
                )
            },
            UploadSpreadsheetError::DbConnection(ref e) => {
                tracing::error!(error = %e, "Database unreachable during upload");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new("DB_CONNECTION_FAILURE", "Database connection failed"),
                )
            },
            UploadSpreadsheetError::Validation(messages) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details(
                    "VALIDATION_FAILURE",
                    "Spreadsheet validation failed",
                    json!(messages),
                ),
            ),
            UploadSpreadsheetError::DbSave(ref e) => {
                tracing::error!(error = %e, "Failed to save spreadsheet");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("DB_SAVE_FAILURE", "Failed to save data to the database"),
                )
            },
            UploadSpreadsheetError::System {
                reference_id,
                ref source,
            } => {
                tracing::error!(%reference_id, error = ?source, "Unexpected upload failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details(
                        "SYSTEM_FAILURE",
                        "An unexpected error occurred",
                        json!({ "reference_id": reference_id }),
                    ),
                )
            },
        };

        (status, Json(body)).into_response()
    }
}
