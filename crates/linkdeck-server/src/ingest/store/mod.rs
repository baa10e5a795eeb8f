//! Persistence seam for ingestion
//!
//! [`LinkStore`] hands out one [`UnitOfWork`] per ingestion run. Everything
//! written through a unit becomes visible only on [`UnitOfWork::commit`];
//! [`UnitOfWork::checkpoint`] marks progress inside the unit but never commits
//! the outer transaction.
//!
//! Two implementations exist: [`postgres::PgLinkStore`] for the server and
//! [`memory::MemoryStore`] for tests and dry runs.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewLink, QuickStats, SheetRecord, SpreadsheetRecord};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryStore, StoreContents};
pub use postgres::PgLinkStore;

/// Postgres SQLSTATE for a value too long for its column
const STRING_DATA_RIGHT_TRUNCATION: &str = "22001";

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness, foreign-key, check or width constraint rejected a write
    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            let width_violation = db_err.code().as_deref() == Some(STRING_DATA_RIGHT_TRUNCATION);
            if db_err.is_unique_violation()
                || db_err.is_foreign_key_violation()
                || db_err.is_check_violation()
                || width_violation
            {
                return StoreError::Integrity(db_err.message().to_string());
            }
        }
        if matches!(
            err,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
        ) {
            return StoreError::Unavailable(err.to_string());
        }
        StoreError::Database(err)
    }
}

/// Rows removed when a spreadsheet subtree is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletedCounts {
    pub links: u64,
    pub sheets: u64,
}

#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Cheap connectivity check
    async fn ping(&self) -> Result<(), StoreError>;

    async fn quick_stats(&self, user_id: i64) -> Result<QuickStats, StoreError>;
}

/// One transactional ingestion run
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_spreadsheet(
        &mut self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<SpreadsheetRecord>, StoreError>;

    /// Delete links, then sheets, then the spreadsheet itself
    async fn delete_spreadsheet_tree(&mut self, spreadsheet_id: i64) -> Result<DeletedCounts, StoreError>;

    async fn create_spreadsheet(&mut self, user_id: i64, name: &str) -> Result<SpreadsheetRecord, StoreError>;

    async fn find_sheet(&mut self, spreadsheet_id: i64, name: &str) -> Result<Option<SheetRecord>, StoreError>;

    async fn create_sheet(&mut self, spreadsheet_id: i64, name: &str) -> Result<SheetRecord, StoreError>;

    /// Plain insert; a duplicate `(sheet_id, title, link_url)` is an integrity error
    async fn insert_links(&mut self, links: &[NewLink]) -> Result<u64, StoreError>;

    /// Insert or overwrite the status of an existing `(sheet_id, title, link_url)`
    ///
    /// A batch must not contain the same key twice.
    async fn upsert_links(&mut self, links: &[NewLink]) -> Result<u64, StoreError>;

    async fn checkpoint(&mut self) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
