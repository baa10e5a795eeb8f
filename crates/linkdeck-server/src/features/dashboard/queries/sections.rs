use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::models::RESERVED_SHEET_NAME;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SectionSummary {
    pub id: i64,
    pub name: String,
    pub spreadsheet_id: i64,
    pub spreadsheet_name: String,
    pub link_count: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ListSectionsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Non-reserved sheets of the user, in upload order
#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, user_id: i64) -> Result<Vec<SectionSummary>, ListSectionsError> {
    let sections = sqlx::query_as::<_, SectionSummary>(
        r#"
        SELECT s.id, s.name, sp.id AS spreadsheet_id, sp.name AS spreadsheet_name,
               COUNT(l.id) AS link_count
        FROM sheets s
        JOIN spreadsheets sp ON sp.id = s.spreadsheet_id
        LEFT JOIN links l ON l.sheet_id = s.id
        WHERE sp.user_id = $1 AND lower(trim(s.name)) <> $2
        GROUP BY s.id, sp.id
        ORDER BY sp.id, s.id
        "#,
    )
    .bind(user_id)
    .bind(RESERVED_SHEET_NAME)
    .fetch_all(&pool)
    .await?;

    Ok(sections)
}
