//! Ingestion configuration
//!
//! Batch sizing and write mode for spreadsheet ingestion (`INGEST_*` variables).

use serde::{Deserialize, Serialize};

/// Links written per insert statement.
pub const DEFAULT_LINK_BATCH_SIZE: usize = 500;

/// Upper bound on the batch size; four bind parameters per link must stay
/// well under the Postgres limit of 65535.
pub const MAX_LINK_BATCH_SIZE: usize = 5000;

/// Batches written between checkpoints.
pub const DEFAULT_CHECKPOINT_BATCHES: usize = 10;

/// How a re-upload of an existing spreadsheet is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinkWriteMode {
    /// Delete the old subtree and insert the new content
    #[default]
    Replace,
    /// Keep the spreadsheet and its sheets, upsert links by (sheet, title, url)
    Merge,
}

impl std::str::FromStr for LinkWriteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(LinkWriteMode::Replace),
            "merge" | "upsert" => Ok(LinkWriteMode::Merge),
            other => anyhow::bail!("Invalid INGEST_WRITE_MODE: {}. Must be 'replace' or 'merge'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    pub link_batch_size: usize,
    /// Checkpoint after this many batches (and at the end of every sheet)
    pub checkpoint_every_batches: usize,
    pub write_mode: LinkWriteMode,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            link_batch_size: DEFAULT_LINK_BATCH_SIZE,
            checkpoint_every_batches: DEFAULT_CHECKPOINT_BATCHES,
            write_mode: LinkWriteMode::Replace,
        }
    }
}

impl IngestConfig {
    /// Load ingestion configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            link_batch_size: std::env::var("INGEST_LINK_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LINK_BATCH_SIZE),
            checkpoint_every_batches: std::env::var("INGEST_CHECKPOINT_BATCHES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CHECKPOINT_BATCHES),
            write_mode: match std::env::var("INGEST_WRITE_MODE") {
                Ok(mode) => mode.parse()?,
                Err(_) => LinkWriteMode::default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.link_batch_size == 0 || self.link_batch_size > MAX_LINK_BATCH_SIZE {
            anyhow::bail!(
                "INGEST_LINK_BATCH_SIZE must be between 1 and {} (got {})",
                MAX_LINK_BATCH_SIZE,
                self.link_batch_size
            );
        }
        if self.checkpoint_every_batches == 0 {
            anyhow::bail!("INGEST_CHECKPOINT_BATCHES must be greater than 0");
        }
        Ok(())
    }

    pub fn with_write_mode(mut self, mode: LinkWriteMode) -> Self {
        self.write_mode = mode;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults_are_valid() {
        let config = IngestConfig::default();
        assert_eq!(config.link_batch_size, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_size_bounds() {
        let mut config = IngestConfig::default();
        config.link_batch_size = 0;
        assert!(config.validate().is_err());
        config.link_batch_size = MAX_LINK_BATCH_SIZE + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_write_mode_parsing() {
        assert_eq!("Merge".parse::<LinkWriteMode>().unwrap(), LinkWriteMode::Merge);
        assert_eq!("replace".parse::<LinkWriteMode>().unwrap(), LinkWriteMode::Replace);
        assert!("append".parse::<LinkWriteMode>().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("INGEST_LINK_BATCH_SIZE", "250");
        std::env::set_var("INGEST_WRITE_MODE", "merge");

        let config = IngestConfig::from_env().unwrap();

        std::env::remove_var("INGEST_LINK_BATCH_SIZE");
        std::env::remove_var("INGEST_WRITE_MODE");

        assert_eq!(config.link_batch_size, 250);
        assert_eq!(config.write_mode, LinkWriteMode::Merge);
        assert_eq!(config.checkpoint_every_batches, DEFAULT_CHECKPOINT_BATCHES);
    }
}
