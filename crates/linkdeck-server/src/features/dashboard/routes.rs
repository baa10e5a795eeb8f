//! Dashboard API routes
//!
//! Read-only views over the caller's spreadsheets. The reserved
//! `credentials` sheet never appears in any of them.
//!
//! # Route Structure
//!
//! - `GET /api/v1/dashboard` - Spreadsheets with sheets and links
//! - `GET /api/v1/dashboard/stats` - Quick stats
//! - `GET /api/v1/dashboard/sections` - Section list
//! - `GET /api/v1/dashboard/sections/:name` - Links of one section
//! - `GET /api/v1/dashboard/status-options` - Distinct link statuses

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;

use super::queries::{
    DashboardDataError, GetSectionLinksError, GetSectionLinksQuery, ListSectionsError,
    StatusOptionsError,
};
use crate::api::response::ApiResponse;
use crate::error::{ApiResult, AppError};
use crate::middleware::CurrentUser;

pub fn dashboard_routes() -> Router<PgPool> {
    Router::new()
        .route("/", get(dashboard_data))
        .route("/stats", get(stats))
        .route("/sections", get(list_sections))
        .route("/sections/:name", get(section_links))
        .route("/status-options", get(status_options))
}

async fn dashboard_data(
    State(pool): State<PgPool>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Response> {
    let spreadsheets = super::queries::dashboard_data::handle(pool, user_id).await?;
    let total = spreadsheets.len();
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success_with_meta(spreadsheets, json!({ "total": total }))),
    )
        .into_response())
}

async fn stats(State(pool): State<PgPool>, CurrentUser(user_id): CurrentUser) -> ApiResult<Response> {
    let stats = super::queries::stats::handle(pool, user_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(stats))).into_response())
}

async fn list_sections(
    State(pool): State<PgPool>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Response> {
    let sections = super::queries::sections::handle(pool, user_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(sections))).into_response())
}

#[tracing::instrument(skip(pool))]
async fn section_links(
    State(pool): State<PgPool>,
    CurrentUser(user_id): CurrentUser,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let response =
        super::queries::section_links::handle(pool, user_id, GetSectionLinksQuery { name }).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

async fn status_options(
    State(pool): State<PgPool>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Response> {
    let statuses = super::queries::status_options::handle(pool, user_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(statuses))).into_response())
}

impl From<DashboardDataError> for AppError {
    fn from(err: DashboardDataError) -> Self {
        match err {
            DashboardDataError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ListSectionsError> for AppError {
    fn from(err: ListSectionsError) -> Self {
        match err {
            ListSectionsError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<StatusOptionsError> for AppError {
    fn from(err: StatusOptionsError) -> Self {
        match err {
            StatusOptionsError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<GetSectionLinksError> for AppError {
    fn from(err: GetSectionLinksError) -> Self {
        match err {
            GetSectionLinksError::NameRequired => AppError::BadRequest(err.to_string()),
            GetSectionLinksError::NotFound(_) => AppError::NotFound(err.to_string()),
            GetSectionLinksError::Database(e) => AppError::Database(e),
        }
    }
}
