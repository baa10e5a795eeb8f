//! Ingestion and dashboard queries against a real PostgreSQL
//!
//! Run with: cargo test --test postgres_store_tests -- --ignored

mod common;

use std::sync::Arc;

use linkdeck_common::UploadStatus;
use linkdeck_server::{
    features::dashboard::queries::{dashboard_data, section_links, sections, stats, status_options, GetSectionLinksQuery},
    ingest::{IngestConfig, IngestError, IngestRequest, Ingestor, LinkStore, LinkWriteMode, NoopProgress, PgLinkStore},
};
use tempfile::TempDir;

use common::{write_file, xlsx_bytes, TestPostgres};

fn ingestor(pg: &TestPostgres, config: IngestConfig) -> Ingestor {
    Ingestor::new(
        Arc::new(PgLinkStore::new(pg.pool().clone())),
        Arc::new(NoopProgress),
        config,
    )
}

async fn count(pg: &TestPostgres, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pg.pool())
        .await
        .unwrap()
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_ingest_and_dashboard_views() {
    let pg = TestPostgres::start().await.unwrap();
    let dir = TempDir::new().unwrap();
    let docs: &[&[&str]] = &[
        &["Title", "Link", "Status"],
        &["Docs", "http://x", "Active"],
        &["Wiki", "http://w", ""],
    ];
    let secrets: &[&[&str]] = &[&["user", "password"], &["admin", "hunter2"]];
    let path = write_file(&dir, "team.xlsx", &xlsx_bytes(&[("Docs", docs), ("Credentials", secrets)]));

    let outcome = ingestor(&pg, IngestConfig::default())
        .ingest(IngestRequest::new(&path, 7))
        .await
        .unwrap();
    assert_eq!(outcome.status, UploadStatus::Uploaded);

    let views = dashboard_data::handle(pg.pool().clone(), 7).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].name, "team.xlsx");
    assert_eq!(views[0].sheets.len(), 1);
    assert_eq!(views[0].sheets[0].links.len(), 2);

    let summaries = sections::handle(pg.pool().clone(), 7).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].link_count, 2);

    let section = section_links::handle(
        pg.pool().clone(),
        7,
        GetSectionLinksQuery {
            name: "Docs".to_string(),
        },
    )
    .await
    .unwrap();
    let statuses: Vec<&str> = section.links.iter().map(|l| l.status.as_str()).collect();
    assert!(statuses.contains(&"active"));
    assert!(statuses.contains(&"unknown"));

    let options = status_options::handle(pg.pool().clone(), 7).await.unwrap();
    assert_eq!(options, vec!["Active".to_string(), "Unknown".to_string()]);

    let quick = stats::handle(pg.pool().clone(), 7).await.unwrap();
    assert_eq!(quick.total_files, 1);
    assert_eq!(quick.total_sections, 1);
    assert!(quick.last_upload.is_some());

    assert!(dashboard_data::handle(pg.pool().clone(), 8).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_reupload_replaces_tree() {
    let pg = TestPostgres::start().await.unwrap();
    let dir = TempDir::new().unwrap();
    let ingestor = ingestor(&pg, IngestConfig::default());

    let path = write_file(&dir, "links.csv", b"title,link,status\nA,http://a,active\nB,http://b,active\n");
    ingestor.ingest(IngestRequest::new(&path, 1)).await.unwrap();

    let path = write_file(&dir, "links.csv", b"title,link,status\nC,http://c,active\n");
    let outcome = ingestor.ingest(IngestRequest::new(&path, 1)).await.unwrap();

    assert_eq!(outcome.status, UploadStatus::Updated);
    assert_eq!(count(&pg, "spreadsheets").await, 1);
    assert_eq!(count(&pg, "sheets").await, 1);
    assert_eq!(count(&pg, "links").await, 1);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_validation_failure_keeps_previous_upload() {
    let pg = TestPostgres::start().await.unwrap();
    let dir = TempDir::new().unwrap();
    let ingestor = ingestor(&pg, IngestConfig::default());

    let path = write_file(&dir, "links.csv", b"title,link,status\nA,http://a,active\n");
    ingestor.ingest(IngestRequest::new(&path, 1)).await.unwrap();

    let path = write_file(&dir, "links.csv", b"title,status\nA,active\n");
    let err = ingestor.ingest(IngestRequest::new(&path, 1)).await.unwrap_err();

    assert!(matches!(err, IngestError::Validation(_)));
    assert_eq!(count(&pg, "links").await, 1);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_integrity_error_rolls_back() {
    let pg = TestPostgres::start().await.unwrap();
    let dir = TempDir::new().unwrap();
    let long_title = "t".repeat(300);
    let csv = format!("title,link,status\nA,http://a,active\n{long_title},http://b,active\n");
    let path = write_file(&dir, "links.csv", csv.as_bytes());

    let err = ingestor(&pg, IngestConfig::default())
        .ingest(IngestRequest::new(&path, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Integrity(_)), "got {err:?}");
    assert_eq!(count(&pg, "spreadsheets").await, 0);
    assert_eq!(count(&pg, "links").await, 0);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_repeated_link_in_replace_mode() {
    let pg = TestPostgres::start().await.unwrap();
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "links.csv",
        b"Title,Link,Status\nDocs,http://x,active\nDocs,http://x,stale\n",
    );

    let outcome = ingestor(&pg, IngestConfig::default())
        .ingest(IngestRequest::new(&path, 1))
        .await
        .unwrap();

    assert_eq!(outcome.links_written(), 1);
    let status = sqlx::query_scalar::<_, Option<String>>("SELECT status FROM links WHERE title = 'Docs'")
        .fetch_one(pg.pool())
        .await
        .unwrap();
    assert_eq!(status.as_deref(), Some("stale"));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_failure_after_checkpoint_rolls_back_whole_upload() {
    let pg = TestPostgres::start().await.unwrap();
    let dir = TempDir::new().unwrap();
    let config = IngestConfig {
        link_batch_size: 2,
        checkpoint_every_batches: 1,
        ..IngestConfig::default()
    };
    let ingestor = ingestor(&pg, config);

    let path = write_file(&dir, "links.csv", b"title,link,status\nKeep,http://keep,active\n");
    ingestor.ingest(IngestRequest::new(&path, 1)).await.unwrap();

    // Batches 1 and 2 are checkpointed before the over-long title in batch 3
    let long_title = "t".repeat(300);
    let csv = format!(
        "title,link,status\nA,http://a,ok\nB,http://b,ok\nC,http://c,ok\nD,http://d,ok\n{long_title},http://e,ok\nF,http://f,ok\n"
    );
    let path = write_file(&dir, "links.csv", csv.as_bytes());
    let err = ingestor.ingest(IngestRequest::new(&path, 1)).await.unwrap_err();

    assert!(matches!(err, IngestError::Integrity(_)), "got {err:?}");
    let titles = sqlx::query_scalar::<_, String>("SELECT title FROM links ORDER BY id")
        .fetch_all(pg.pool())
        .await
        .unwrap();
    assert_eq!(titles, vec!["Keep".to_string()]);
    assert_eq!(count(&pg, "spreadsheets").await, 1);
    assert_eq!(count(&pg, "sheets").await, 1);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_merge_mode_upserts() {
    let pg = TestPostgres::start().await.unwrap();
    let dir = TempDir::new().unwrap();
    let config = IngestConfig::default().with_write_mode(LinkWriteMode::Merge);
    let ingestor = ingestor(&pg, config);

    let path = write_file(&dir, "links.csv", b"title,link,status\nA,http://a,active\n");
    ingestor.ingest(IngestRequest::new(&path, 1)).await.unwrap();

    let path = write_file(
        &dir,
        "links.csv",
        b"title,link,status\nA,http://a,draft\nA,http://a,archived\nB,http://b,active\n",
    );
    ingestor.ingest(IngestRequest::new(&path, 1)).await.unwrap();

    assert_eq!(count(&pg, "links").await, 2);
    let status = sqlx::query_scalar::<_, Option<String>>("SELECT status FROM links WHERE title = 'A'")
        .fetch_one(pg.pool())
        .await
        .unwrap();
    assert_eq!(status.as_deref(), Some("archived"));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_small_batches_with_checkpoints() {
    let pg = TestPostgres::start().await.unwrap();
    let dir = TempDir::new().unwrap();
    let mut csv = String::from("title,link,status\n");
    for i in 0..25 {
        csv.push_str(&format!("Link {i},http://example.com/{i},active\n"));
    }
    let path = write_file(&dir, "many.csv", csv.as_bytes());
    let config = IngestConfig {
        link_batch_size: 4,
        checkpoint_every_batches: 2,
        ..IngestConfig::default()
    };

    let outcome = ingestor(&pg, config)
        .ingest(IngestRequest::new(&path, 1))
        .await
        .unwrap();

    assert_eq!(outcome.links_written(), 25);
    assert_eq!(count(&pg, "links").await, 25);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_ping_and_concurrent_same_name() {
    let pg = TestPostgres::start().await.unwrap();
    let dir = TempDir::new().unwrap();
    let store = PgLinkStore::new(pg.pool().clone());
    store.ping().await.unwrap();

    let ingestor = ingestor(&pg, IngestConfig::default());
    let path = write_file(&dir, "links.csv", b"title,link,status\nA,http://a,active\n");

    let (first, second) = tokio::join!(
        ingestor.ingest(IngestRequest::new(&path, 1)),
        ingestor.ingest(IngestRequest::new(&path, 1)),
    );

    let mut statuses = vec![first.unwrap().status, second.unwrap().status];
    statuses.sort_by_key(|s| s.as_str());
    assert_eq!(statuses, vec![UploadStatus::Updated, UploadStatus::Uploaded]);
    assert_eq!(count(&pg, "spreadsheets").await, 1);
}
