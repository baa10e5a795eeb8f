//! Ingestion orchestrator
//!
//! Drives one upload from file to committed Spreadsheet/Sheet/Link subtree:
//!
//! 1. read the file on a blocking thread
//! 2. validate structure (nothing is written if this fails)
//! 3. take the upload lock and open a unit of work
//! 4. resolve a [`ReplacePlan`] against any same-named spreadsheet
//! 5. clean and persist each non-reserved sheet in batches
//! 6. commit, or roll back on any error
//!
//! Progress is published through the injected sink and cleared when the run
//! ends, whatever the outcome.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use linkdeck_common::UploadStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cleaner::{clean_with_report, link_rows, LinkRow};
use super::config::{IngestConfig, LinkWriteMode};
use super::error::IngestError;
use super::lock::UploadLocks;
use super::progress::{ProgressGuard, ProgressKey, ProgressSink, Stage};
use super::reader;
use super::store::{LinkStore, UnitOfWork};
use super::table::{RawSheet, SheetMap};
use super::validator;
use crate::models::{NewLink, SpreadsheetRecord};

/// One ingestion call
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub path: PathBuf,
    pub user_id: i64,
    pub upload_id: Uuid,
    /// Name the spreadsheet is stored under; defaults to the file name
    pub display_name: Option<String>,
}

impl IngestRequest {
    pub fn new(path: impl Into<PathBuf>, user_id: i64) -> Self {
        Self {
            path: path.into(),
            user_id,
            upload_id: Uuid::new_v4(),
            display_name: None,
        }
    }

    pub fn with_upload_id(mut self, upload_id: Uuid) -> Self {
        self.upload_id = upload_id;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    fn spreadsheet_name(&self) -> Result<String, IngestError> {
        if let Some(ref name) = self.display_name {
            return Ok(name.clone());
        }
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                IngestError::Unexpected(anyhow::anyhow!(
                    "Upload path {} has no file name",
                    self.path.display()
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSummary {
    pub name: String,
    pub links_written: usize,
    /// Rows dropped for a missing title or link
    pub rows_dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub status: UploadStatus,
    pub spreadsheet_id: i64,
    pub spreadsheet_name: String,
    pub sheets: Vec<SheetSummary>,
}

impl IngestOutcome {
    pub fn links_written(&self) -> usize {
        self.sheets.iter().map(|s| s.links_written).sum()
    }

    pub fn rows_dropped(&self) -> usize {
        self.sheets.iter().map(|s| s.rows_dropped).sum()
    }
}

/// What to do with a same-named spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacePlan {
    CreateNew,
    /// Delete the old subtree, then create afresh
    ReplaceExisting(SpreadsheetRecord),
    /// Keep the old spreadsheet and upsert into it
    MergeInto(SpreadsheetRecord),
}

impl ReplacePlan {
    pub fn resolve(existing: Option<SpreadsheetRecord>, mode: LinkWriteMode) -> Self {
        match (existing, mode) {
            (None, _) => ReplacePlan::CreateNew,
            (Some(old), LinkWriteMode::Replace) => ReplacePlan::ReplaceExisting(old),
            (Some(old), LinkWriteMode::Merge) => ReplacePlan::MergeInto(old),
        }
    }

    pub fn status(&self) -> UploadStatus {
        match self {
            ReplacePlan::CreateNew => UploadStatus::Uploaded,
            ReplacePlan::ReplaceExisting(_) | ReplacePlan::MergeInto(_) => UploadStatus::Updated,
        }
    }

    fn merges(&self) -> bool {
        matches!(self, ReplacePlan::MergeInto(_))
    }
}

#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn LinkStore>,
    progress: Arc<dyn ProgressSink>,
    locks: UploadLocks,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(store: Arc<dyn LinkStore>, progress: Arc<dyn ProgressSink>, config: IngestConfig) -> Self {
        Self {
            store,
            progress,
            locks: UploadLocks::new(),
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn LinkStore> {
        &self.store
    }

    /// Ingest a file under its own name and report whether it was new
    pub async fn ingest_file(&self, path: &Path, user_id: i64) -> Result<UploadStatus, IngestError> {
        self.ingest(IngestRequest::new(path, user_id))
            .await
            .map(|outcome| outcome.status)
    }

    #[tracing::instrument(
        skip(self, request),
        fields(
            user_id = request.user_id,
            upload_id = %request.upload_id,
            file = %request.path.display(),
            mode = ?self.config.write_mode
        )
    )]
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, IngestError> {
        let key = ProgressKey::new(request.user_id, request.upload_id);
        let mut progress = ProgressGuard::start(self.progress.clone(), key);

        let result = self.run(&request, &mut progress).await;

        match &result {
            Ok(outcome) => tracing::info!(
                status = %outcome.status,
                spreadsheet_id = outcome.spreadsheet_id,
                sheets = outcome.sheets.len(),
                links = outcome.links_written(),
                rows_dropped = outcome.rows_dropped(),
                "Ingestion committed"
            ),
            Err(err @ (IngestError::Validation(_) | IngestError::UnsupportedFormat(_))) => {
                tracing::warn!(kind = err.kind(), error = %err, "Upload rejected")
            },
            Err(err @ IngestError::Integrity(_)) => {
                tracing::error!(error = %err, "Ingestion rolled back on integrity violation")
            },
            Err(err) => tracing::error!(kind = err.kind(), error = ?err, "Ingestion failed"),
        }

        result
    }

    async fn run(
        &self,
        request: &IngestRequest,
        progress: &mut ProgressGuard,
    ) -> Result<IngestOutcome, IngestError> {
        let name = request.spreadsheet_name()?;

        progress.stage(Stage::ReadingFile);
        let mut sheets = read_blocking(request.path.clone()).await?;

        progress.stage(Stage::Validating);
        let errors = validator::validate(&mut sheets);
        if !errors.is_empty() {
            return Err(IngestError::Validation(errors));
        }

        let _lease = self.locks.acquire(request.user_id, &name).await;
        let mut uow = self.store.begin().await?;

        match self
            .persist(uow.as_mut(), request.user_id, &name, &sheets, progress)
            .await
        {
            Ok(outcome) => {
                progress.stage(Stage::Finalizing);
                uow.commit().await?;
                Ok(outcome)
            },
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed; transaction is discarded");
                }
                Err(err)
            },
        }
    }

    async fn persist(
        &self,
        uow: &mut dyn UnitOfWork,
        user_id: i64,
        name: &str,
        sheets: &SheetMap,
        progress: &mut ProgressGuard,
    ) -> Result<IngestOutcome, IngestError> {
        let existing = uow.find_spreadsheet(user_id, name).await?;
        let plan = ReplacePlan::resolve(existing, self.config.write_mode);
        let status = plan.status();
        let merge = plan.merges();

        let spreadsheet = match plan {
            ReplacePlan::CreateNew => uow.create_spreadsheet(user_id, name).await?,
            ReplacePlan::ReplaceExisting(old) => {
                let deleted = uow.delete_spreadsheet_tree(old.id).await?;
                tracing::debug!(
                    old_id = old.id,
                    links = deleted.links,
                    sheets = deleted.sheets,
                    "Replacing existing spreadsheet"
                );
                uow.create_spreadsheet(user_id, name).await?
            },
            ReplacePlan::MergeInto(existing) => existing,
        };
        progress.stage(Stage::DatabaseSetup);

        let processable: Vec<&RawSheet> = sheets.processable().collect();
        let total = processable.len();
        let mut summaries = Vec::with_capacity(total);

        for (processed, sheet) in processable.into_iter().enumerate() {
            progress.sheet(&sheet.name, processed, total);
            summaries.push(self.persist_sheet(uow, spreadsheet.id, sheet, merge).await?);
        }

        Ok(IngestOutcome {
            status,
            spreadsheet_id: spreadsheet.id,
            spreadsheet_name: spreadsheet.name,
            sheets: summaries,
        })
    }

    async fn persist_sheet(
        &self,
        uow: &mut dyn UnitOfWork,
        spreadsheet_id: i64,
        sheet: &RawSheet,
        merge: bool,
    ) -> Result<SheetSummary, IngestError> {
        let existing = if merge {
            uow.find_sheet(spreadsheet_id, &sheet.name).await?
        } else {
            None
        };
        let record = match existing {
            Some(found) => found,
            None => uow.create_sheet(spreadsheet_id, &sheet.name).await?,
        };

        let (cleaned, report) = clean_with_report(&sheet.table);
        if report.rows_dropped() > 0 {
            tracing::warn!(
                sheet = %sheet.name,
                dropped = report.rows_dropped(),
                rows = ?report.dropped_rows,
                "Dropped rows missing a title or link"
            );
        }
        if report.truncated_statuses > 0 {
            tracing::debug!(sheet = %sheet.name, truncated = report.truncated_statuses, "Statuses truncated");
        }

        let rows = link_rows(&cleaned)?;
        let row_count = rows.len();
        let rows = last_write_wins(rows);
        if rows.len() < row_count {
            tracing::debug!(
                sheet = %sheet.name,
                collapsed = row_count - rows.len(),
                "Repeated title and link rows collapsed, last status kept"
            );
        }
        let links: Vec<NewLink> = rows
            .into_iter()
            .map(|row| NewLink {
                sheet_id: record.id,
                title: row.title,
                link_url: row.link,
                status: row.status,
            })
            .collect();

        let mut written = 0u64;
        for (idx, batch) in links.chunks(self.config.link_batch_size).enumerate() {
            written += if merge {
                uow.upsert_links(batch).await?
            } else {
                uow.insert_links(batch).await?
            };
            if (idx + 1) % self.config.checkpoint_every_batches == 0 {
                uow.checkpoint().await?;
            }
        }
        uow.checkpoint().await?;

        tracing::debug!(sheet = %sheet.name, sheet_id = record.id, links = written, "Sheet persisted");

        Ok(SheetSummary {
            name: sheet.name.clone(),
            links_written: written as usize,
            rows_dropped: report.rows_dropped(),
        })
    }
}

async fn read_blocking(path: PathBuf) -> Result<SheetMap, IngestError> {
    let (sheets, _format) = tokio::task::spawn_blocking(move || reader::read(&path))
        .await
        .map_err(|e| IngestError::Unexpected(anyhow::Error::new(e).context("Reader task failed")))??;
    Ok(sheets)
}

/// Collapse rows sharing a (title, link) key, keeping the last one's status
fn last_write_wins(rows: Vec<LinkRow>) -> Vec<LinkRow> {
    let mut positions: HashMap<(String, String), usize> = HashMap::new();
    let mut unique: Vec<LinkRow> = Vec::with_capacity(rows.len());

    for row in rows {
        let key = (row.title.clone(), row.link.clone());
        match positions.get(&key) {
            Some(&idx) => unique[idx] = row,
            None => {
                positions.insert(key, unique.len());
                unique.push(row);
            },
        }
    }

    unique
}
