//! Content document types
//!
//! Serialized shapes match what the single-page client consumes; field
//! names stay camelCase on the wire.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One development log entry
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Devlog {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub summary: String,
    pub content: String,
    pub order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_color: Option<String>,
}

/// Lore archive category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoreCategory {
    World,
    Faction,
    Tech,
}

impl Default for LoreCategory {
    fn default() -> Self {
        LoreCategory::World
    }
}

/// One lore archive entry
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoreEntry {
    pub id: String,
    pub title: String,
    pub category: LoreCategory,
    pub summary: String,
    pub content: String,
    pub order: i64,
}

/// One system documentation page.
///
/// `ost` optionally names an ambience track id; the client switches the
/// background music to it while the page is open.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemDoc {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ost: Option<String>,
}

/// Media type of a gallery item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GalleryKind {
    Image,
    Video,
    Gif,
}

/// One gallery item, described by `gallery/gallery.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: String,
    pub filename: String,
    pub caption: String,
    #[serde(rename = "type")]
    pub kind: GalleryKind,
}
