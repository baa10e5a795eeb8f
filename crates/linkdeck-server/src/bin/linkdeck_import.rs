//! linkdeck-import - ingest a spreadsheet from the command line
//!
//! ```text
//! linkdeck-import links.xlsx --user-id 7
//! linkdeck-import links.csv --user-id 7 --mode merge
//! linkdeck-import links.csv --user-id 7 --dry-run
//! ```
//!
//! The outcome is printed to stdout as JSON; logs go to stderr.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use linkdeck_common::logging::{init_logging, LogConfig, LogLevel};
use tracing::error;

use linkdeck_server::{
    db,
    ingest::{IngestConfig, IngestRequest, Ingestor, LinkStore, LinkWriteMode, MemoryStore, NoopProgress, PgLinkStore},
};

#[derive(Debug, Parser)]
#[command(name = "linkdeck-import", version, about = "Ingest a CSV, XLS or XLSX file into linkdeck")]
struct Cli {
    /// Spreadsheet to ingest
    file: PathBuf,

    /// Owner of the spreadsheet
    #[arg(long, env = "LINKDECK_USER_ID")]
    user_id: i64,

    /// Store under this name instead of the file name
    #[arg(long)]
    name: Option<String>,

    /// How to apply a re-upload: replace or merge
    #[arg(long)]
    mode: Option<LinkWriteMode>,

    /// Ingest into a throwaway in-memory store
    #[arg(long)]
    dry_run: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Warn };
    let base = || {
        LogConfig::builder()
            .level(level)
            .console_stderr(true)
            .log_file_prefix("linkdeck-import")
            .build()
    };

    // Environment variables take precedence
    let log_config = base().merge_env().unwrap_or_else(|e| {
        eprintln!("Ignoring invalid logging environment: {e}");
        base()
    });

    // The import works without logging
    let _log_guard = init_logging(&log_config).ok();

    if let Err(e) = run(cli).await {
        error!(error = %e, "Import failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    dotenvy::dotenv().ok();

    let mut ingest_config = IngestConfig::from_env()?;
    if let Some(mode) = cli.mode {
        ingest_config = ingest_config.with_write_mode(mode);
    }

    let store: Arc<dyn LinkStore> = if cli.dry_run {
        Arc::new(MemoryStore::new())
    } else {
        let pool = db::create_pool(&db::DbConfig::from_env()?)
            .await
            .context("Failed to connect to the database")?;
        db::migrate(&pool).await?;
        Arc::new(PgLinkStore::new(pool))
    };

    let ingestor = Ingestor::new(store, Arc::new(NoopProgress), ingest_config);

    let mut request = IngestRequest::new(&cli.file, cli.user_id);
    if let Some(name) = cli.name {
        request = request.with_display_name(name);
    }

    let outcome = ingestor.ingest(request).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_merge_dry_run() {
        let cli = Cli::try_parse_from([
            "linkdeck-import",
            "links.csv",
            "--user-id",
            "7",
            "--mode",
            "merge",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.user_id, 7);
        assert_eq!(cli.mode, Some(LinkWriteMode::Merge));
        assert!(cli.dry_run);
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let result = Cli::try_parse_from(["linkdeck-import", "links.csv", "--user-id", "7", "--mode", "append"]);
        assert!(result.is_err());
    }
}
