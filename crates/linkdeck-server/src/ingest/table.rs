//! In-memory tabular model produced by the reader
//!
//! A [`SheetTable`] keeps its declared columns separately from the row data so
//! that a sheet with headers but no rows still carries its column set. Cells
//! are `Option<String>`; `None` is a missing value.

use crate::models::is_reserved_sheet;

/// File family a sheet mapping came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Excel,
}

/// One parsed sheet: declared column names plus rows of optional cells
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl SheetTable {
    /// Build a table, padding or truncating rows to the column count
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Convenience constructor used heavily in tests
    pub fn from_strs(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| normalize_cell(cell)).collect())
                .collect(),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `(row, column)`, `None` when missing or out of range
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [String] {
        &mut self.columns
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vec<Option<String>>>) {
        (self.columns, self.rows)
    }
}

/// Treat empty and whitespace-only text as a missing value
pub fn normalize_cell(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// A named sheet inside a [`SheetMap`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSheet {
    pub name: String,
    pub table: SheetTable,
}

/// Ordered sheet-name to table mapping, in workbook order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetMap {
    sheets: Vec<RawSheet>,
}

impl SheetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sheet, replacing an earlier sheet with the same name in place
    pub fn insert(&mut self, name: impl Into<String>, table: SheetTable) {
        let name = name.into();
        match self.sheets.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.table = table,
            None => self.sheets.push(RawSheet { name, table }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SheetTable> {
        self.sheets.iter().find(|s| s.name == name).map(|s| &s.table)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawSheet> {
        self.sheets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RawSheet> {
        self.sheets.iter_mut()
    }

    /// Sheets that take part in ingestion, skipping reserved names
    pub fn processable(&self) -> impl Iterator<Item = &RawSheet> {
        self.sheets.iter().filter(|s| !is_reserved_sheet(&s.name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

impl FromIterator<(String, SheetTable)> for SheetMap {
    fn from_iter<I: IntoIterator<Item = (String, SheetTable)>>(iter: I) -> Self {
        let mut map = SheetMap::new();
        for (name, table) in iter {
            map.insert(name, table);
        }
        map
    }
}
