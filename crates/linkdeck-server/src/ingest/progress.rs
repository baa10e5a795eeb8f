//! Ingestion progress reporting
//!
//! The orchestrator publishes through a [`ProgressSink`] it is handed at
//! construction time. The HTTP layer reads the same state from a
//! [`ProgressRegistry`], which is the sink used by the server.
//!
//! An entry exists only while an ingestion runs; its absence means idle.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use linkdeck_common::ProgressSnapshot;
use uuid::Uuid;

/// Identifies one ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub user_id: i64,
    pub upload_id: Uuid,
}

impl ProgressKey {
    pub fn new(user_id: i64, upload_id: Uuid) -> Self {
        Self { user_id, upload_id }
    }
}

/// Fixed checkpoints of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initializing,
    ReadingFile,
    Validating,
    DatabaseSetup,
    Finalizing,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Initializing => "Initializing",
            Stage::ReadingFile => "Reading file",
            Stage::Validating => "Validating",
            Stage::DatabaseSetup => "Database setup",
            Stage::Finalizing => "Finalizing",
        }
    }

    pub fn percent(self) -> u8 {
        match self {
            Stage::Initializing => 0,
            Stage::ReadingFile => 5,
            Stage::Validating => 10,
            Stage::DatabaseSetup => 20,
            Stage::Finalizing => 95,
        }
    }
}

/// Percentage reported when starting sheet `processed` of `total`
///
/// Sheets share the 20..90 band; zero sheets report 0.
pub fn sheet_progress(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let processed = processed.min(total);
    let band = 70 * processed / total;
    20 + band as u8
}

/// Receives progress updates from a running ingestion
pub trait ProgressSink: Send + Sync {
    fn publish(&self, key: ProgressKey, snapshot: ProgressSnapshot);
    fn clear(&self, key: ProgressKey);
}

/// Shared in-process progress table
///
/// Keyed by user and upload id together, so a client reusing another user's
/// upload id gets a separate entry. Writers never hold the lock across an
/// await point.
#[derive(Debug, Clone, Default)]
pub struct ProgressRegistry {
    entries: Arc<RwLock<HashMap<ProgressKey, ProgressSnapshot>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: ProgressKey) -> Option<ProgressSnapshot> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&key).cloned()
    }

    /// Most recently updated run of a user, if any is active
    pub fn latest_for_user(&self, user_id: i64) -> Option<ProgressSnapshot> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|(key, _)| key.user_id == user_id)
            .map(|(_, snapshot)| snapshot)
            .max_by_key(|snapshot| snapshot.timestamp)
            .cloned()
    }

    /// Look up a run, only returning it to the user that owns it
    pub fn get_for_user(&self, user_id: i64, upload_id: Uuid) -> Option<ProgressSnapshot> {
        self.get(ProgressKey::new(user_id, upload_id))
    }

    pub fn active_runs(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ProgressSink for ProgressRegistry {
    fn publish(&self, key: ProgressKey, snapshot: ProgressSnapshot) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, snapshot);
    }

    fn clear(&self, key: ProgressKey) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&key);
    }
}

/// Progress handle owned by one ingestion run
///
/// Reported percentages never go backwards. Dropping the guard removes the
/// entry, so every exit path leaves the sink idle for this key.
pub struct ProgressGuard {
    sink: Arc<dyn ProgressSink>,
    key: ProgressKey,
    last: u8,
}

impl ProgressGuard {
    /// Register the run and publish the initial stage
    pub fn start(sink: Arc<dyn ProgressSink>, key: ProgressKey) -> Self {
        let mut guard = Self { sink, key, last: 0 };
        guard.stage(Stage::Initializing);
        guard
    }

    pub fn key(&self) -> ProgressKey {
        self.key
    }

    pub fn stage(&mut self, stage: Stage) {
        self.publish(stage.label().to_string(), stage.percent(), String::new());
    }

    /// Announce the sheet about to be processed
    pub fn sheet(&mut self, name: &str, processed: usize, total: usize) {
        self.publish(
            format!("Processing {name}"),
            sheet_progress(processed, total),
            name.to_string(),
        );
    }

    fn publish(&mut self, status: String, progress: u8, current_sheet: String) {
        let progress = progress.max(self.last);
        self.last = progress;
        tracing::trace!(upload_id = %self.key.upload_id, progress, status = %status, "Progress");
        self.sink
            .publish(self.key, ProgressSnapshot::new(status, progress, current_sheet));
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.sink.clear(self.key);
    }
}

/// Sink that discards every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn publish(&self, _key: ProgressKey, _snapshot: ProgressSnapshot) {}
    fn clear(&self, _key: ProgressKey) {}
}
