//! In-memory store with the same constraints as the SQL schema
//!
//! A unit of work takes the store-wide lock for its whole lifetime and edits a
//! private copy of the tables. Commit swaps the copy in; rollback or drop
//! discards it. Units are therefore fully serialized.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{DeletedCounts, LinkStore, StoreError, UnitOfWork};
use crate::models::{
    is_reserved_sheet, LinkRecord, NewLink, QuickStats, SheetRecord, SpreadsheetRecord,
    MAX_NAME_LENGTH, MAX_TITLE_LENGTH,
};

/// Unique key of a link within its sheet: (sheet_id, title, link_url)
type LinkKey = (i64, String, String);

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    spreadsheets: BTreeMap<i64, SpreadsheetRecord>,
    sheets: BTreeMap<i64, SheetRecord>,
    links: BTreeMap<i64, LinkRecord>,
    /// Mirrors the unique index on links
    link_keys: HashMap<LinkKey, i64>,
}

fn link_key(link: &NewLink) -> LinkKey {
    (link.sheet_id, link.title.clone(), link.link_url.clone())
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn push_link(&mut self, link: &NewLink) -> i64 {
        let id = self.allocate_id();
        self.links.insert(
            id,
            LinkRecord {
                id,
                sheet_id: link.sheet_id,
                title: link.title.clone(),
                link_url: link.link_url.clone(),
                status: Some(link.status.clone()),
                pinned: false,
            },
        );
        self.link_keys.insert(link_key(link), id);
        id
    }

    fn check_link(&self, link: &NewLink) -> Result<(), StoreError> {
        if !self.sheets.contains_key(&link.sheet_id) {
            return Err(StoreError::Integrity(format!(
                "links.sheet_id {} references a missing sheet",
                link.sheet_id
            )));
        }
        if link.title.is_empty() || link.link_url.is_empty() {
            return Err(StoreError::Integrity("link title and url must be non-empty".to_string()));
        }
        if link.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(StoreError::Integrity(format!(
                "link title longer than {MAX_TITLE_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

/// Committed rows, ordered by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreContents {
    pub spreadsheets: Vec<SpreadsheetRecord>,
    pub sheets: Vec<SheetRecord>,
    pub links: Vec<LinkRecord>,
}

impl StoreContents {
    pub fn sheets_of(&self, spreadsheet_id: i64) -> Vec<&SheetRecord> {
        self.sheets
            .iter()
            .filter(|s| s.spreadsheet_id == spreadsheet_id)
            .collect()
    }

    pub fn links_of(&self, sheet_id: i64) -> Vec<&LinkRecord> {
        self.links.iter().filter(|l| l.sheet_id == sheet_id).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `ping` and `begin` fail as if the database were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn contents(&self) -> StoreContents {
        let tables = self.tables.lock().await;
        StoreContents {
            spreadsheets: tables.spreadsheets.values().cloned().collect(),
            sheets: tables.sheets.values().cloned().collect(),
            links: tables.links.values().cloned().collect(),
        }
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        self.check_online()?;
        let guard = self.tables.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }

    async fn quick_stats(&self, user_id: i64) -> Result<QuickStats, StoreError> {
        self.check_online()?;
        let tables = self.tables.lock().await;

        let owned: Vec<&SpreadsheetRecord> = tables
            .spreadsheets
            .values()
            .filter(|s| s.user_id == user_id)
            .collect();
        let total_sections = tables
            .sheets
            .values()
            .filter(|sheet| !is_reserved_sheet(&sheet.name))
            .filter(|sheet| owned.iter().any(|s| s.id == sheet.spreadsheet_id))
            .count();

        Ok(QuickStats {
            total_files: owned.len() as i64,
            total_sections: total_sections as i64,
            last_upload: owned.iter().map(|s| s.created_at).max(),
        })
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_spreadsheet(
        &mut self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<SpreadsheetRecord>, StoreError> {
        Ok(self
            .working
            .spreadsheets
            .values()
            .find(|s| s.user_id == user_id && s.name == name)
            .cloned())
    }

    async fn delete_spreadsheet_tree(&mut self, spreadsheet_id: i64) -> Result<DeletedCounts, StoreError> {
        let sheet_ids: Vec<i64> = self
            .working
            .sheets
            .values()
            .filter(|s| s.spreadsheet_id == spreadsheet_id)
            .map(|s| s.id)
            .collect();

        let doomed: HashSet<i64> = sheet_ids.iter().copied().collect();
        let before = self.working.links.len();
        self.working.links.retain(|_, l| !doomed.contains(&l.sheet_id));
        self.working.link_keys.retain(|(sheet_id, _, _), _| !doomed.contains(sheet_id));
        let links = (before - self.working.links.len()) as u64;

        for id in &sheet_ids {
            self.working.sheets.remove(id);
        }
        self.working.spreadsheets.remove(&spreadsheet_id);

        Ok(DeletedCounts {
            links,
            sheets: sheet_ids.len() as u64,
        })
    }

    async fn create_spreadsheet(&mut self, user_id: i64, name: &str) -> Result<SpreadsheetRecord, StoreError> {
        if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            return Err(StoreError::Integrity(format!(
                "spreadsheet name must be 1 to {MAX_NAME_LENGTH} characters"
            )));
        }
        if self
            .working
            .spreadsheets
            .values()
            .any(|s| s.user_id == user_id && s.name == name)
        {
            return Err(StoreError::Integrity(format!(
                "spreadsheet '{name}' already exists for user {user_id}"
            )));
        }

        let record = SpreadsheetRecord {
            id: self.working.allocate_id(),
            name: name.to_string(),
            user_id,
            created_at: Utc::now(),
        };
        self.working.spreadsheets.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_sheet(&mut self, spreadsheet_id: i64, name: &str) -> Result<Option<SheetRecord>, StoreError> {
        Ok(self
            .working
            .sheets
            .values()
            .find(|s| s.spreadsheet_id == spreadsheet_id && s.name == name)
            .cloned())
    }

    async fn create_sheet(&mut self, spreadsheet_id: i64, name: &str) -> Result<SheetRecord, StoreError> {
        if !self.working.spreadsheets.contains_key(&spreadsheet_id) {
            return Err(StoreError::Integrity(format!(
                "sheets.spreadsheet_id {spreadsheet_id} references a missing spreadsheet"
            )));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(StoreError::Integrity(format!(
                "sheet name longer than {MAX_NAME_LENGTH} characters"
            )));
        }

        let record = SheetRecord {
            id: self.working.allocate_id(),
            spreadsheet_id,
            name: name.to_string(),
        };
        self.working.sheets.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_links(&mut self, links: &[NewLink]) -> Result<u64, StoreError> {
        for link in links {
            self.working.check_link(link)?;
            if self.working.link_keys.contains_key(&link_key(link)) {
                return Err(StoreError::Integrity(format!(
                    "duplicate link ({}, {}) in sheet {}",
                    link.title, link.link_url, link.sheet_id
                )));
            }
            self.working.push_link(link);
        }
        Ok(links.len() as u64)
    }

    async fn upsert_links(&mut self, links: &[NewLink]) -> Result<u64, StoreError> {
        for link in links {
            self.working.check_link(link)?;
            match self.working.link_keys.get(&link_key(link)).copied() {
                Some(id) => {
                    if let Some(record) = self.working.links.get_mut(&id) {
                        record.status = Some(link.status.clone());
                    }
                },
                None => {
                    self.working.push_link(link);
                },
            }
        }
        Ok(links.len() as u64)
    }

    async fn checkpoint(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
