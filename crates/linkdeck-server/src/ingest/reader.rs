//! Tabular reader: CSV and Excel files into a [`SheetMap`]
//!
//! CSV input becomes a single sheet named [`CSV_SHEET_NAME`]. Excel workbooks
//! yield one sheet per tab in workbook order, with the first row of each tab
//! taken as its header row.
//!
//! Reading is blocking I/O; async callers go through
//! `tokio::task::spawn_blocking`.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use thiserror::Error;

use super::table::{normalize_cell, SheetMap, SheetTable, SourceFormat};

/// Sheet name given to the only sheet of a CSV upload
pub const CSV_SHEET_NAME: &str = "Default";

/// Extensions accepted by [`read`], lowercase and without the dot
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "xls", "xlsx"];

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Unsupported file format: '{0}'. Allowed formats: csv, xls, xlsx")]
    UnsupportedFormat(String),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read workbook: {0}")]
    Excel(#[from] calamine::Error),
}

impl SourceFormat {
    /// Detect the format from a file extension, case-insensitively
    pub fn from_path(path: &Path) -> Result<Self, ReadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xls" | "xlsx" => Ok(SourceFormat::Excel),
            _ => Err(ReadError::UnsupportedFormat(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )),
        }
    }
}

/// Load a file into an ordered sheet mapping
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn read(path: &Path) -> Result<(SheetMap, SourceFormat), ReadError> {
    let format = SourceFormat::from_path(path)?;

    let sheets = match format {
        SourceFormat::Csv => read_csv(path)?,
        SourceFormat::Excel => read_workbook(path)?,
    };

    tracing::debug!(sheets = sheets.len(), ?format, "File parsed");
    Ok((sheets, format))
}

fn read_csv(path: &Path) -> Result<SheetMap, ReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let columns = header_names(reader.headers()?.iter().map(|h| h.to_string()));

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(normalize_cell).collect());
    }

    let mut sheets = SheetMap::new();
    sheets.insert(CSV_SHEET_NAME, SheetTable::new(columns, rows));
    Ok(sheets)
}

fn read_workbook(path: &Path) -> Result<SheetMap, ReadError> {
    let mut workbook = open_workbook_auto(path)?;
    let names: Vec<String> = workbook.sheet_names().to_vec();

    let mut sheets = SheetMap::new();
    for name in names {
        let range = workbook.worksheet_range(&name)?;
        sheets.insert(name, range_to_table(&range));
    }
    Ok(sheets)
}

fn range_to_table(range: &Range<Data>) -> SheetTable {
    let mut rows = range.rows();

    let Some(header) = rows.next() else {
        return SheetTable::default();
    };
    let columns = header_names(header.iter().map(cell_text));

    let rows = rows
        .map(|row| row.iter().map(|c| normalize_cell(&cell_text(c))).collect())
        .collect();

    SheetTable::new(columns, rows)
}

/// Fill blank header cells with positional names
fn header_names(raw: impl Iterator<Item = String>) -> Vec<String> {
    raw.enumerate()
        .map(|(idx, name)| {
            let name = name.trim_start_matches('\u{feff}');
            if name.trim().is_empty() {
                format!("unnamed_{idx}")
            } else {
                name.to_string()
            }
        })
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => (*f as i64).to_string(),
        Data::Error(e) => format!("{e:?}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_temp(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_csv_becomes_default_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "links.csv", "Title,Link,Status\nDocs,http://x,active\n");

        let (sheets, format) = read(&path).unwrap();

        assert_eq!(format, SourceFormat::Csv);
        assert_eq!(sheets.names(), vec![CSV_SHEET_NAME]);
        let table = sheets.get(CSV_SHEET_NAME).unwrap();
        assert_eq!(table.columns(), &["Title", "Link", "Status"]);
        assert_eq!(table.cell(0, "Link"), Some("http://x"));
    }

    #[test]
    fn test_csv_ragged_rows_and_blank_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "ragged.CSV", "Title,Link,Status\nDocs,http://x\n  ,http://y,\n");

        let (sheets, _) = read(&path).unwrap();
        let table = sheets.get(CSV_SHEET_NAME).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, "Status"), None);
        assert_eq!(table.cell(1, "Title"), None);
    }

    #[test]
    fn test_header_only_csv_keeps_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "empty.csv", "title,link,status\n");

        let (sheets, _) = read(&path).unwrap();
        let table = sheets.get(CSV_SHEET_NAME).unwrap();

        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 3);
    }

    #[test]
    fn test_blank_header_gets_positional_name() {
        let names = header_names(vec!["a".to_string(), " ".to_string(), "\u{feff}c".to_string()].into_iter());
        assert_eq!(names, vec!["a", "unnamed_1", "c"]);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "notes.txt", "hello");

        let err = read(&path).unwrap_err();
        assert!(matches!(err, ReadError::UnsupportedFormat(ref name) if name == "notes.txt"));
        assert!(SourceFormat::from_path(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_format_detection_is_case_insensitive() {
        assert_eq!(SourceFormat::from_path(Path::new("a.XLSX")).unwrap(), SourceFormat::Excel);
        assert_eq!(SourceFormat::from_path(Path::new("a.Xls")).unwrap(), SourceFormat::Excel);
        assert_eq!(SourceFormat::from_path(Path::new("a.csv")).unwrap(), SourceFormat::Csv);
    }

    #[test]
    fn test_numeric_cells_render_without_fraction() {
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Int(42)), "42");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_workbook_tabs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let first = workbook.add_worksheet();
        first.set_name("Links").unwrap();
        first.write_string(0, 0, "Title").unwrap();
        first.write_string(0, 1, "Link").unwrap();
        first.write_string(0, 2, "Status").unwrap();
        first.write_string(1, 0, "Docs").unwrap();
        first.write_string(1, 1, "http://x").unwrap();
        first.write_number(1, 2, 7.0).unwrap();
        let second = workbook.add_worksheet();
        second.set_name("Archive").unwrap();
        second.write_string(0, 0, "title").unwrap();
        workbook.save(&path).unwrap();

        let (sheets, format) = read(&path).unwrap();

        assert_eq!(format, SourceFormat::Excel);
        assert_eq!(sheets.names(), vec!["Links", "Archive"]);
        let links = sheets.get("Links").unwrap();
        assert_eq!(links.cell(0, "Title"), Some("Docs"));
        assert_eq!(links.cell(0, "Status"), Some("7"));
        assert!(sheets.get("Archive").unwrap().is_empty());
    }
}
