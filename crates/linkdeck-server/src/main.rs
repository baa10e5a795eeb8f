//! linkdeck server - main entry point

use std::{future::IntoFuture, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use linkdeck_common::logging::{init_logging, LogConfig};
use tokio::{signal, sync::watch};
use tracing::{info, warn};

use linkdeck_server::{
    api,
    config::Config,
    db,
    features::FeatureState,
    ingest::{Ingestor, PgLinkStore, ProgressRegistry},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let log_config = LogConfig::builder()
        .log_file_prefix("linkdeck-server")
        .filter_directives("linkdeck_server=debug,tower_http=debug,sqlx=warn")
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting linkdeck server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let db_pool = db::create_pool(&db::DbConfig::from(&config.database)).await?;
    info!("Database connection pool established");

    db::migrate(&db_pool).await?;
    info!("Database migrations completed");

    tokio::fs::create_dir_all(&config.upload.dir).await?;

    let progress = ProgressRegistry::new();
    let ingestor = Ingestor::new(
        Arc::new(PgLinkStore::new(db_pool.clone())),
        Arc::new(progress.clone()),
        config.ingest.clone(),
    );
    info!(
        batch_size = config.ingest.link_batch_size,
        mode = ?config.ingest.write_mode,
        "Ingestion pipeline ready"
    );

    let state = FeatureState {
        db: db_pool,
        ingestor,
        progress,
        upload: config.upload.clone(),
    };

    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.changed().await;
            })
            .into_future(),
    );

    shutdown_signal().await;
    let _ = stop_tx.send(true);

    // In-flight uploads get a bounded drain window
    let drain = Duration::from_secs(config.server.shutdown_timeout_secs);
    match tokio::time::timeout(drain, server).await {
        Ok(joined) => {
            joined??;
            info!("Server shut down gracefully");
        },
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Connections still open after drain window, exiting"
        ),
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
