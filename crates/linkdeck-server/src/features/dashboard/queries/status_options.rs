use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum StatusOptionsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Distinct non-empty statuses across the user's links, for filter menus
#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, user_id: i64) -> Result<Vec<String>, StatusOptionsError> {
    let statuses = sqlx::query_scalar::<_, String>(
        r#"
        SELECT DISTINCT l.status
        FROM links l
        JOIN sheets s ON s.id = l.sheet_id
        JOIN spreadsheets sp ON sp.id = s.spreadsheet_id
        WHERE sp.user_id = $1 AND l.status IS NOT NULL AND l.status <> ''
        ORDER BY l.status
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(statuses)
}
