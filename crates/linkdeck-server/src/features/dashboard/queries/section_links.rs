use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::ingest::cleaner::DEFAULT_LINK_STATUS;
use crate::models::{is_reserved_sheet, LinkRecord, SheetRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSectionLinksQuery {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLink {
    pub id: i64,
    pub title: String,
    pub url: String,
    /// Lower-cased; `unknown` when the stored status is missing
    pub status: String,
    pub pinned: bool,
}

impl From<LinkRecord> for SectionLink {
    fn from(link: LinkRecord) -> Self {
        Self {
            id: link.id,
            title: link.title,
            url: link.link_url,
            status: display_status(link.status.as_deref()),
            pinned: link.pinned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSectionLinksResponse {
    pub section: SheetRecord,
    pub links: Vec<SectionLink>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetSectionLinksError {
    #[error("Section name is required and cannot be empty")]
    NameRequired,
    #[error("Section '{0}' not found")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GetSectionLinksQuery {
    pub fn validate(&self) -> Result<(), GetSectionLinksError> {
        if self.name.trim().is_empty() {
            return Err(GetSectionLinksError::NameRequired);
        }
        if is_reserved_sheet(&self.name) {
            return Err(GetSectionLinksError::NotFound(self.name.clone()));
        }
        Ok(())
    }
}

fn display_status(status: Option<&str>) -> String {
    match status.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => DEFAULT_LINK_STATUS.to_string(),
    }
}

/// Links of the user's first section with the given name
#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    user_id: i64,
    query: GetSectionLinksQuery,
) -> Result<GetSectionLinksResponse, GetSectionLinksError> {
    query.validate()?;

    let section = sqlx::query_as::<_, SheetRecord>(
        r#"
        SELECT s.id, s.spreadsheet_id, s.name
        FROM sheets s
        JOIN spreadsheets sp ON sp.id = s.spreadsheet_id
        WHERE sp.user_id = $1 AND s.name = $2
        ORDER BY s.id
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(&query.name)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| GetSectionLinksError::NotFound(query.name.clone()))?;

    let links = sqlx::query_as::<_, LinkRecord>(
        r#"
        SELECT id, sheet_id, title, link_url, status, pinned
        FROM links
        WHERE sheet_id = $1
        ORDER BY pinned DESC, id
        "#,
    )
    .bind(section.id)
    .fetch_all(&pool)
    .await?;

    Ok(GetSectionLinksResponse {
        section,
        links: links.into_iter().map(SectionLink::from).collect(),
    })
}
