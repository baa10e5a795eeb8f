use sqlx::PgPool;

use crate::ingest::{LinkStore, PgLinkStore, StoreError};
use crate::models::QuickStats;

/// Header counters: files, displayable sections, last upload time
#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, user_id: i64) -> Result<QuickStats, StoreError> {
    PgLinkStore::new(pool).quick_stats(user_id).await
}
