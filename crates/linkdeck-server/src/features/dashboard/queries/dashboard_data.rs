use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::models::RESERVED_SHEET_NAME;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetView {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub sheets: Vec<SheetView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetView {
    pub id: i64,
    pub name: String,
    pub links: Vec<LinkView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkView {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub status: Option<String>,
    pub pinned: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardDataError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Every spreadsheet of the user with its displayable sheets and links
#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, user_id: i64) -> Result<Vec<SpreadsheetView>, DashboardDataError> {
    let rows = sqlx::query_as::<_, DashboardRow>(
        r#"
        SELECT sp.id AS spreadsheet_id, sp.name AS spreadsheet_name, sp.created_at,
               s.id AS sheet_id, s.name AS sheet_name,
               l.id AS link_id, l.title, l.link_url, l.status, l.pinned
        FROM spreadsheets sp
        LEFT JOIN sheets s
               ON s.spreadsheet_id = sp.id AND lower(trim(s.name)) <> $2
        LEFT JOIN links l ON l.sheet_id = s.id
        WHERE sp.user_id = $1
        ORDER BY sp.created_at DESC, sp.id, s.id, l.pinned DESC, l.id
        "#,
    )
    .bind(user_id)
    .bind(RESERVED_SHEET_NAME)
    .fetch_all(&pool)
    .await?;

    Ok(assemble(rows))
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct DashboardRow {
    spreadsheet_id: i64,
    spreadsheet_name: String,
    created_at: DateTime<Utc>,
    sheet_id: Option<i64>,
    sheet_name: Option<String>,
    link_id: Option<i64>,
    title: Option<String>,
    link_url: Option<String>,
    status: Option<String>,
    pinned: Option<bool>,
}

/// Fold ordered join rows into the nested view
fn assemble(rows: Vec<DashboardRow>) -> Vec<SpreadsheetView> {
    let mut spreadsheets: Vec<SpreadsheetView> = Vec::new();

    for row in rows {
        if spreadsheets.last().map(|s| s.id) != Some(row.spreadsheet_id) {
            spreadsheets.push(SpreadsheetView {
                id: row.spreadsheet_id,
                name: row.spreadsheet_name.clone(),
                created_at: row.created_at,
                sheets: Vec::new(),
            });
        }
        let Some(spreadsheet) = spreadsheets.last_mut() else {
            continue;
        };

        let (Some(sheet_id), Some(sheet_name)) = (row.sheet_id, row.sheet_name) else {
            continue;
        };
        if spreadsheet.sheets.last().map(|s| s.id) != Some(sheet_id) {
            spreadsheet.sheets.push(SheetView {
                id: sheet_id,
                name: sheet_name,
                links: Vec::new(),
            });
        }
        let Some(sheet) = spreadsheet.sheets.last_mut() else {
            continue;
        };

        if let (Some(id), Some(title), Some(url)) = (row.link_id, row.title, row.link_url) {
            sheet.links.push(LinkView {
                id,
                title,
                url,
                status: row.status,
                pinned: row.pinned.unwrap_or(false),
            });
        }
    }

    spreadsheets
}
