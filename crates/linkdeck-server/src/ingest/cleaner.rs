//! Row-level cleaning of a validated sheet
//!
//! Cleaning never fails: rows that cannot become links are dropped and the
//! drop is recorded in a [`CleanReport`]. Applying [`clean`] to its own
//! output changes nothing.

use thiserror::Error;

use super::table::SheetTable;
use super::validator::{LINK_COLUMN, STATUS_COLUMN, TITLE_COLUMN};

/// Status written into empty status cells
pub const FILLED_STATUS: &str = "Unknown";

/// Status given to links from a sheet that has no status column after cleaning
pub const DEFAULT_LINK_STATUS: &str = "unknown";

/// Longest status kept, in characters
pub const MAX_STATUS_CHARS: usize = 50;

/// What cleaning removed or rewrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Columns removed because every cell was empty
    pub dropped_columns: Vec<String>,
    /// 1-based data row numbers dropped for a missing title or link
    pub dropped_rows: Vec<usize>,
    pub filled_statuses: usize,
    pub truncated_statuses: usize,
}

impl CleanReport {
    pub fn rows_dropped(&self) -> usize {
        self.dropped_rows.len()
    }
}

/// A cleaned row, ready to be persisted under a sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRow {
    pub title: String,
    pub link: String,
    pub status: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CleanError {
    #[error("Cleaned sheet is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
}

/// Clean a sheet, discarding the report
pub fn clean(table: &SheetTable) -> SheetTable {
    clean_with_report(table).0
}

pub fn clean_with_report(table: &SheetTable) -> (SheetTable, CleanReport) {
    let mut report = CleanReport::default();
    let (mut columns, mut rows) = table.clone().into_parts();

    report.dropped_columns = drop_empty_columns(&mut columns, &mut rows);

    let status_idx = columns.iter().position(|c| c == STATUS_COLUMN);

    if let Some(idx) = status_idx {
        for row in rows.iter_mut() {
            if row[idx].is_none() {
                row[idx] = Some(FILLED_STATUS.to_string());
                report.filled_statuses += 1;
            }
        }
    }

    let title_idx = columns.iter().position(|c| c == TITLE_COLUMN);
    let link_idx = columns.iter().position(|c| c == LINK_COLUMN);
    let mut kept = Vec::with_capacity(rows.len());
    for (idx, row) in rows.into_iter().enumerate() {
        let complete = match (title_idx, link_idx) {
            (Some(t), Some(l)) => row[t].is_some() && row[l].is_some(),
            _ => false,
        };
        if complete {
            kept.push(row);
        } else {
            report.dropped_rows.push(idx + 1);
        }
    }
    let mut rows = kept;

    if let Some(idx) = status_idx {
        for row in rows.iter_mut() {
            if let Some(status) = row[idx].as_mut() {
                if status.chars().count() > MAX_STATUS_CHARS {
                    *status = status.chars().take(MAX_STATUS_CHARS).collect();
                    report.truncated_statuses += 1;
                }
            }
        }
    }

    // Row removal can leave columns with nothing in them.
    let emptied = drop_empty_columns(&mut columns, &mut rows);
    report.dropped_columns.extend(emptied);

    (SheetTable::new(columns, rows), report)
}

/// Remove columns whose cells are all missing, returning their names
fn drop_empty_columns(columns: &mut Vec<String>, rows: &mut [Vec<Option<String>>]) -> Vec<String> {
    let keep: Vec<bool> = (0..columns.len())
        .map(|idx| rows.iter().any(|row| row[idx].is_some()))
        .collect();

    if keep.iter().all(|k| *k) {
        return Vec::new();
    }

    let mut dropped = Vec::new();
    let mut flags = keep.iter();
    columns.retain(|name| {
        let kept = flags.next().copied().unwrap_or(true);
        if !kept {
            dropped.push(name.clone());
        }
        kept
    });

    for row in rows.iter_mut() {
        let mut flags = keep.iter();
        row.retain(|_| flags.next().copied().unwrap_or(true));
    }

    dropped
}

/// Turn a cleaned table into typed link rows
///
/// An empty table yields no rows. A non-empty table without `title` or `link`
/// is an error; cleaning never produces one, so this only fires if cleaning was
/// skipped.
pub fn link_rows(table: &SheetTable) -> Result<Vec<LinkRow>, CleanError> {
    if table.is_empty() {
        return Ok(Vec::new());
    }

    let title_idx = table.column_index(TITLE_COLUMN);
    let link_idx = table.column_index(LINK_COLUMN);
    let (title_idx, link_idx) = match (title_idx, link_idx) {
        (Some(t), Some(l)) => (t, l),
        (t, l) => {
            let mut missing = Vec::new();
            if t.is_none() {
                missing.push(TITLE_COLUMN);
            }
            if l.is_none() {
                missing.push(LINK_COLUMN);
            }
            return Err(CleanError::MissingColumns(missing));
        },
    };
    let status_idx = table.column_index(STATUS_COLUMN);

    let rows = table
        .rows()
        .iter()
        .filter_map(|row| {
            let title = row[title_idx].clone()?;
            let link = row[link_idx].clone()?;
            let status = status_idx
                .and_then(|idx| row[idx].clone())
                .unwrap_or_else(|| DEFAULT_LINK_STATUS.to_string());
            Some(LinkRow {
                title,
                link,
                status,
            })
        })
        .collect();

    Ok(rows)
}
