//! nomad-site specific configuration

use std::path::PathBuf;

/// Site server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,

    /// Markdown content tree (devlogs/, lore/, systems/, gallery/)
    pub content_dir: PathBuf,

    /// Static assets root (audio/ lives here)
    pub assets_dir: PathBuf,

    /// Built single-page client, served with index fallback
    pub client_dist: PathBuf,
}
