use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warcserver::{
    Config,
    handlers::{AppState, create_router},
    index::{FilesystemScanner, LocationIndex, TrackDbSync, run_updater},
    storage::{ContentStreamer, LocalStorage, WebHdfsStorage},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let index = Arc::new(LocationIndex::new());
    let shutdown = CancellationToken::new();
    let mut updaters = Vec::new();

    // Start looking for files
    let scanner = Arc::new(FilesystemScanner::new(config.search_roots()));
    tracing::info!("Scanning local paths: {:?}", scanner.roots());
    updaters.push(tokio::spawn(run_updater(
        scanner,
        Arc::clone(&index),
        config.scan_interval(),
        shutdown.clone(),
    )));

    if config.disable_trackdb {
        tracing::info!("Tracking database disabled, serving local files only");
    } else {
        let trackdb = Arc::new(TrackDbSync::new(
            &config.trackdb_url,
            config.trackdb_max_rows,
            config.connect_timeout(),
        )?);
        tracing::info!("Tracking database: {}", config.trackdb_url);
        updaters.push(tokio::spawn(run_updater(
            trackdb,
            Arc::clone(&index),
            config.trackdb_interval(),
            shutdown.clone(),
        )));
    }

    let webhdfs = WebHdfsStorage::new(
        config.webhdfs_prefix.clone(),
        config.webhdfs_user.clone(),
        config.connect_timeout(),
    )?;

    let state = AppState {
        index,
        streamer: Arc::new(ContentStreamer::new(LocalStorage::new(), webhdfs)),
        partial_content: config.partial_content,
    };

    let app = create_router(state);
    let app = if config.cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    let addr = config.bind_addr();
    tracing::info!("Starting warcserver on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    for updater in updaters {
        updater.await?;
    }

    Ok(())
}
