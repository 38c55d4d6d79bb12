//! Ambience demo - drives the manager through a scripted route walk
//!
//! Useful for hearing crossfades against real audio files (`--assets-dir`)
//! or for watching the state machine run against the simulated backend.

use anyhow::{Context, Result};
use clap::Parser;
use nomad_ambience::graph::AudioBackend;
use nomad_ambience::{
    AmbienceConfig, AudioManager, RodioBackend, SettingsStore, SimBackend, TrackRegistry,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for the ambience demo
#[derive(Parser, Debug)]
#[command(name = "ambience-demo")]
#[command(about = "Route walk through the Nomad Protocol ambience manager")]
#[command(version)]
struct Args {
    /// Assets root containing the audio/ files; omit to use the simulated
    /// backend
    #[arg(short, long, env = "NOMAD_ASSETS_DIR")]
    assets_dir: Option<PathBuf>,

    /// Settings database path
    #[arg(short, long, default_value = "ambience-settings.db", env = "NOMAD_SETTINGS_DB")]
    settings_db: String,

    /// Seconds to dwell on each route
    #[arg(short, long, default_value = "4")]
    dwell: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nomad_ambience=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let backend: Arc<dyn AudioBackend> = match &args.assets_dir {
        Some(dir) => {
            info!("using device output, assets under {}", dir.display());
            Arc::new(RodioBackend::new(dir.clone()))
        }
        None => {
            info!("no assets dir given, using simulated backend");
            let sim = SimBackend::new();
            sim.user_gesture();
            Arc::new(sim)
        }
    };

    let store = SettingsStore::open(&args.settings_db)
        .await
        .context("Failed to open settings database")?;

    let manager = AudioManager::new(
        TrackRegistry::site_default(),
        AmbienceConfig::default(),
        backend,
        store,
    )
    .await
    .context("Failed to construct ambience manager")?;

    let subscription = manager.subscribe(Arc::new(|muted| {
        info!(muted, "mute state changed");
    }));

    manager.initialize().await?;

    let walk = [
        "/",
        "/devlogs",
        "/devlogs/017-rations",
        "/lore",
        "/systems",
        "/gallery",
        "/",
    ];
    for route in walk {
        info!(route, track = %manager.current_track_id(), "navigating");
        manager.set_context(route).await?;
        tokio::time::sleep(Duration::from_secs(args.dwell)).await;
    }

    info!("toggling mute twice");
    manager.toggle_mute().await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    manager.toggle_mute().await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    subscription.unsubscribe();
    info!(
        muted = manager.is_muted(),
        blocked = manager.is_autoplay_blocked(),
        track = %manager.current_track_id(),
        "walk complete"
    );
    Ok(())
}
