//! Persisted records of the Spreadsheet -> Sheet -> Link tree

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sheet name that is never ingested or listed, compared case-insensitively
pub const RESERVED_SHEET_NAME: &str = "credentials";

/// Column widths enforced by the schema
pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_TITLE_LENGTH: usize = 255;

pub fn is_reserved_sheet(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(RESERVED_SHEET_NAME)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SpreadsheetRecord {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SheetRecord {
    pub id: i64,
    pub spreadsheet_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LinkRecord {
    pub id: i64,
    pub sheet_id: i64,
    pub title: String,
    pub link_url: String,
    pub status: Option<String>,
    pub pinned: bool,
}

/// A link ready to be written under a known sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub sheet_id: i64,
    pub title: String,
    pub link_url: String,
    pub status: String,
}

/// Per-user counters shown on the dashboard header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickStats {
    pub total_files: i64,
    /// Sheets across all files, excluding reserved sheets
    pub total_sections: i64,
    pub last_upload: Option<DateTime<Utc>>,
}
