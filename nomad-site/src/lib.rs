//! # Nomad Protocol site server (nomad-site)
//!
//! Thin content API over a markdown tree (devlogs, lore archive, system
//! documentation, media gallery) plus static serving for the single-page
//! client and its ambient audio files.
//!
//! The ambient audio subsystem itself lives in the `nomad-ambience` crate;
//! this server only stores its track files and the per-document `ost`
//! overrides that drive it.

pub mod api;
pub mod config;
pub mod content;
pub mod error;

pub use config::Config;
pub use error::{Result, SiteError};
