//! Spreadsheet ingestion
//!
//! Turns an uploaded CSV, XLS or XLSX file into a Spreadsheet → Sheet → Link
//! subtree owned by one user.
//!
//! # Pipeline
//!
//! ```text
//! reader ──► validator ──► cleaner ──► store
//!   │            │             │          │
//!   └── SheetMap ┴─ normalized ┴─ LinkRow ┴─ one unit of work
//! ```
//!
//! The [`orchestrator::Ingestor`] drives the stages, publishes progress through
//! a [`progress::ProgressSink`] and serializes uploads of the same file name
//! per user with [`lock::UploadLocks`].

pub mod cleaner;
pub mod config;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod progress;
pub mod reader;
pub mod store;
pub mod table;
pub mod validator;

pub use config::{IngestConfig, LinkWriteMode};
pub use error::IngestError;
pub use orchestrator::{IngestOutcome, IngestRequest, Ingestor, ReplacePlan, SheetSummary};
pub use progress::{NoopProgress, ProgressRegistry, ProgressSink};
pub use store::{LinkStore, MemoryStore, PgLinkStore, StoreError};
pub use table::{SheetMap, SheetTable, SourceFormat};
