//! HTTP server setup and routing
//!
//! Sets up the Axum router: JSON content API, static mounts for audio and
//! gallery media, and the built single-page client with index fallback so
//! client-side routes deep-link correctly.

use crate::config::Config;
use crate::content::ContentStore;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub content: Arc<ContentStore>,
}

/// JSON API routes only; static mounts are added by [`create_router`]
pub fn api_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Devlogs API
        .route("/api/devlogs", get(super::handlers::list_devlogs))
        .route("/api/devlogs/:id", get(super::handlers::get_devlog))
        // Lore API
        .route("/api/lore", get(super::handlers::list_lore))
        .route("/api/lore/:id", get(super::handlers::get_lore_entry))
        // Systems API
        .route("/api/systems", get(super::handlers::list_systems))
        .route("/api/systems/:id", get(super::handlers::get_system))
        // Gallery API
        .route("/api/gallery", get(super::handlers::list_gallery))
        // Attach application context
        .with_state(ctx)
}

/// Full site router: API plus static serving
pub fn create_router(ctx: AppContext, config: &Config) -> Router {
    let index = config.client_dist.join("index.html");

    api_router(ctx)
        // Ambient audio files
        .nest_service("/audio", ServeDir::new(config.assets_dir.join("audio")))
        // Gallery media straight out of the content tree
        .nest_service(
            "/gallery-images",
            ServeDir::new(config.content_dir.join("gallery")),
        )
        // Single-page client; unknown paths fall back to index.html for
        // client-side routing
        .fallback_service(
            ServeDir::new(&config.client_dist).fallback(ServeFile::new(index)),
        )
        // Request logging
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local development against a separate client port
        .layer(CorsLayer::permissive())
}
