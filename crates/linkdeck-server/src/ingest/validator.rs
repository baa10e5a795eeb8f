//! Structural validation of a parsed sheet mapping
//!
//! Column names are normalized in place so that later stages can address
//! `title`, `link` and `status` directly. Every offending sheet contributes
//! one message; the caller decides whether a non-empty list aborts.

use super::table::SheetMap;
use crate::models::is_reserved_sheet;

pub const TITLE_COLUMN: &str = "title";
pub const LINK_COLUMN: &str = "link";
pub const STATUS_COLUMN: &str = "status";

/// Columns every non-reserved sheet must declare, in reporting order
pub const REQUIRED_COLUMNS: [&str; 3] = [TITLE_COLUMN, LINK_COLUMN, STATUS_COLUMN];

/// Trim, lowercase, and map spaces, hyphens and colons to underscores
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '-' | ':' => '_',
            other => other,
        })
        .collect()
}

/// Normalize column names and report sheets missing required columns
///
/// Reserved sheets are left untouched and never reported.
#[tracing::instrument(skip(sheets), fields(sheet_count = sheets.len()))]
pub fn validate(sheets: &mut SheetMap) -> Vec<String> {
    let mut errors = Vec::new();

    for sheet in sheets.iter_mut() {
        if is_reserved_sheet(&sheet.name) {
            tracing::debug!(sheet = %sheet.name, "Skipping reserved sheet");
            continue;
        }

        for column in sheet.table.columns_mut() {
            *column = normalize_column_name(column);
        }

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|required| !sheet.table.has_column(required))
            .collect();

        if !missing.is_empty() {
            errors.push(format!(
                "Sheet '{}' missing required columns: {}",
                sheet.name,
                missing.join(", ")
            ));
        }
    }

    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "Structural validation failed");
    }

    errors
}
