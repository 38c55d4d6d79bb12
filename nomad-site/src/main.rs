//! Nomad Protocol site server - main entry point
//!
//! Serves the content API and static assets for the single-page site.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nomad_site::api::{create_router, AppContext};
use nomad_site::config::Config;
use nomad_site::content::ContentStore;

/// Command-line arguments for nomad-site
#[derive(Parser, Debug)]
#[command(name = "nomad-site")]
#[command(about = "Content API and static server for the Nomad Protocol site")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000", env = "NOMAD_PORT")]
    port: u16,

    /// Markdown content tree
    #[arg(short, long, default_value = "content", env = "NOMAD_CONTENT_DIR")]
    content_dir: PathBuf,

    /// Static assets root (audio files)
    #[arg(short, long, default_value = "assets", env = "NOMAD_ASSETS_DIR")]
    assets_dir: PathBuf,

    /// Built single-page client
    #[arg(long, default_value = "dist/public", env = "NOMAD_CLIENT_DIST")]
    client_dist: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nomad_site=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config {
        port: args.port,
        content_dir: args.content_dir,
        assets_dir: args.assets_dir,
        client_dist: args.client_dist,
    };

    info!("Starting Nomad Protocol site on port {}", config.port);
    info!("Content tree: {}", config.content_dir.display());

    let content = Arc::new(ContentStore::new(config.content_dir.clone()));
    log_content_counts(&content);

    let app = create_router(AppContext { content }, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// One startup pass over the content tree so authoring mistakes show up in
/// the log immediately rather than on first request
fn log_content_counts(content: &ContentStore) {
    match content.devlogs() {
        Ok(devlogs) => info!("Loaded {} devlogs", devlogs.len()),
        Err(err) => warn!("Could not scan devlogs: {err}"),
    }
    match content.lore() {
        Ok(lore) => info!("Loaded {} lore entries", lore.len()),
        Err(err) => warn!("Could not scan lore: {err}"),
    }
    match content.systems() {
        Ok(systems) => info!("Loaded {} system docs", systems.len()),
        Err(err) => warn!("Could not scan systems: {err}"),
    }
    match content.gallery() {
        Ok(gallery) => info!("Loaded {} gallery items", gallery.len()),
        Err(err) => warn!("Could not read gallery: {err}"),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
