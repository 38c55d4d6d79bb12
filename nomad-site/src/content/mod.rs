//! Markdown content subsystem

pub mod loader;
pub mod types;

pub use loader::ContentStore;
pub use types::{Devlog, GalleryItem, GalleryKind, LoreCategory, LoreEntry, SystemDoc};
