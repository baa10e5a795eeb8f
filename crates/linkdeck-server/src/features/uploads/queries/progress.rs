use linkdeck_common::ProgressSnapshot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ingest::ProgressRegistry;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetProgressQuery {
    /// Specific run to report; the user's latest run when absent
    pub upload_id: Option<Uuid>,
}

/// Current progress of the caller's ingestion
///
/// Runs owned by other users are invisible. With no matching entry the idle
/// snapshot (`"Not started"`, 0) is returned.
pub fn handle(registry: &ProgressRegistry, user_id: i64, query: GetProgressQuery) -> ProgressSnapshot {
    let snapshot = match query.upload_id {
        Some(upload_id) => registry.get_for_user(user_id, upload_id),
        None => registry.latest_for_user(user_id),
    };
    snapshot.unwrap_or_else(ProgressSnapshot::idle)
}
