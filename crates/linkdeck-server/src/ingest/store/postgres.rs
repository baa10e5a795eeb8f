//! PostgreSQL-backed store
//!
//! A unit of work is one transaction. A rolling savepoint is opened at begin
//! and rolled forward at every checkpoint.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::{DeletedCounts, LinkStore, StoreError, UnitOfWork};
use crate::models::{NewLink, QuickStats, SheetRecord, SpreadsheetRecord, RESERVED_SHEET_NAME};

const OPEN_CHECKPOINT: &str = "SAVEPOINT ingest_checkpoint";
const RELEASE_CHECKPOINT: &str = "RELEASE SAVEPOINT ingest_checkpoint";

#[derive(Debug, Clone)]
pub struct PgLinkStore {
    pool: PgPool,
}

impl PgLinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    total_files: i64,
    total_sections: i64,
    last_upload: Option<chrono::DateTime<chrono::Utc>>,
}

#[async_trait]
impl LinkStore for PgLinkStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(OPEN_CHECKPOINT)
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::db::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn quick_stats(&self, user_id: i64) -> Result<QuickStats, StoreError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM spreadsheets WHERE user_id = $1) AS total_files,
                (SELECT COUNT(*)
                   FROM sheets s
                   JOIN spreadsheets sp ON sp.id = s.spreadsheet_id
                  WHERE sp.user_id = $1 AND lower(trim(s.name)) <> $2) AS total_sections,
                (SELECT MAX(created_at) FROM spreadsheets WHERE user_id = $1) AS last_upload
            "#,
        )
        .bind(user_id)
        .bind(RESERVED_SHEET_NAME)
        .fetch_one(&self.pool)
        .await?;

        Ok(QuickStats {
            total_files: row.total_files,
            total_sections: row.total_sections,
            last_upload: row.last_upload,
        })
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PgUnitOfWork {
    async fn write_links(&mut self, links: &[NewLink], upsert: bool) -> Result<u64, StoreError> {
        if links.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO links (sheet_id, title, link_url, status) ");
        builder.push_values(links, |mut row, link| {
            row.push_bind(link.sheet_id)
                .push_bind(link.title.clone())
                .push_bind(link.link_url.clone())
                .push_bind(link.status.clone());
        });
        if upsert {
            builder.push(
                " ON CONFLICT (sheet_id, title, link_url) DO UPDATE SET status = EXCLUDED.status",
            );
        }

        let result = builder.build().execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_spreadsheet(
        &mut self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<SpreadsheetRecord>, StoreError> {
        let record = sqlx::query_as::<_, SpreadsheetRecord>(
            "SELECT id, name, user_id, created_at FROM spreadsheets WHERE user_id = $1 AND name = $2",
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(record)
    }

    async fn delete_spreadsheet_tree(&mut self, spreadsheet_id: i64) -> Result<DeletedCounts, StoreError> {
        let links = sqlx::query(
            "DELETE FROM links WHERE sheet_id IN (SELECT id FROM sheets WHERE spreadsheet_id = $1)",
        )
        .bind(spreadsheet_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        let sheets = sqlx::query("DELETE FROM sheets WHERE spreadsheet_id = $1")
            .bind(spreadsheet_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM spreadsheets WHERE id = $1")
            .bind(spreadsheet_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(DeletedCounts { links, sheets })
    }

    async fn create_spreadsheet(&mut self, user_id: i64, name: &str) -> Result<SpreadsheetRecord, StoreError> {
        let record = sqlx::query_as::<_, SpreadsheetRecord>(
            r#"
            INSERT INTO spreadsheets (name, user_id)
            VALUES ($1, $2)
            RETURNING id, name, user_id, created_at
            "#,
        )
        .bind(name)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(record)
    }

    async fn find_sheet(&mut self, spreadsheet_id: i64, name: &str) -> Result<Option<SheetRecord>, StoreError> {
        let record = sqlx::query_as::<_, SheetRecord>(
            "SELECT id, spreadsheet_id, name FROM sheets WHERE spreadsheet_id = $1 AND name = $2 ORDER BY id LIMIT 1",
        )
        .bind(spreadsheet_id)
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(record)
    }

    async fn create_sheet(&mut self, spreadsheet_id: i64, name: &str) -> Result<SheetRecord, StoreError> {
        let record = sqlx::query_as::<_, SheetRecord>(
            "INSERT INTO sheets (spreadsheet_id, name) VALUES ($1, $2) RETURNING id, spreadsheet_id, name",
        )
        .bind(spreadsheet_id)
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(record)
    }

    async fn insert_links(&mut self, links: &[NewLink]) -> Result<u64, StoreError> {
        self.write_links(links, false).await
    }

    async fn upsert_links(&mut self, links: &[NewLink]) -> Result<u64, StoreError> {
        self.write_links(links, true).await
    }

    async fn checkpoint(&mut self) -> Result<(), StoreError> {
        sqlx::query(RELEASE_CHECKPOINT)
            .execute(&mut *self.tx)
            .await?;
        sqlx::query(OPEN_CHECKPOINT)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
