//! HTTP request handlers
//!
//! Read-only content endpoints consumed by the single-page client. Loader
//! failures surface as a 500 with a JSON error body and a server-side log
//! line; missing documents are a 404.

use crate::api::server::AppContext;
use crate::content::{Devlog, GalleryItem, LoreEntry, SystemDoc};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::error;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn internal(what: &str, err: impl std::fmt::Display) -> ApiError {
    error!("Error fetching {what}: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: format!("Failed to fetch {what}"),
        }),
    )
}

fn not_found(what: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: format!("{what} not found"),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "nomad_site".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Devlog Endpoints
// ============================================================================

/// GET /api/devlogs - All devlogs in display order
pub async fn list_devlogs(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<Devlog>>, ApiError> {
    let devlogs = ctx
        .content
        .devlogs()
        .map_err(|err| internal("devlogs", err))?;
    Ok(Json(devlogs))
}

/// GET /api/devlogs/:id - One devlog
pub async fn get_devlog(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Devlog>, ApiError> {
    ctx.content
        .devlog(&id)
        .map_err(|err| internal("devlog", err))?
        .map(Json)
        .ok_or_else(|| not_found("Devlog"))
}

// ============================================================================
// Lore Endpoints
// ============================================================================

/// GET /api/lore - All lore entries in display order
pub async fn list_lore(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<LoreEntry>>, ApiError> {
    let lore = ctx.content.lore().map_err(|err| internal("lore", err))?;
    Ok(Json(lore))
}

/// GET /api/lore/:id - One lore entry
pub async fn get_lore_entry(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<LoreEntry>, ApiError> {
    ctx.content
        .lore_entry(&id)
        .map_err(|err| internal("lore", err))?
        .map(Json)
        .ok_or_else(|| not_found("Lore entry"))
}

// ============================================================================
// System Documentation Endpoints
// ============================================================================

/// GET /api/systems - All system docs in display order
pub async fn list_systems(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<SystemDoc>>, ApiError> {
    let systems = ctx
        .content
        .systems()
        .map_err(|err| internal("systems", err))?;
    Ok(Json(systems))
}

/// GET /api/systems/:id - One system doc
pub async fn get_system(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<SystemDoc>, ApiError> {
    ctx.content
        .system(&id)
        .map_err(|err| internal("system", err))?
        .map(Json)
        .ok_or_else(|| not_found("System"))
}

// ============================================================================
// Gallery Endpoint
// ============================================================================

/// GET /api/gallery - All gallery items
pub async fn list_gallery(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<GalleryItem>>, ApiError> {
    let gallery = ctx
        .content
        .gallery()
        .map_err(|err| internal("gallery", err))?;
    Ok(Json(gallery))
}
