//! Markdown content tree access
//!
//! Documents live under the content root as `<subdir>/<id>.md` with TOML
//! front matter between `+++` fences; the body below the fence is served
//! verbatim for the client to render. A missing subdirectory is an empty
//! collection, a malformed document is logged and skipped, and lookups by
//! id return `None` rather than failing.

use crate::content::types::{
    Devlog, GalleryItem, LoreCategory, LoreEntry, SystemDoc,
};
use crate::error::{Result, SiteError};
use chrono::NaiveDate;
use nomad_ambience::TrackRegistry;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Read access to the markdown content tree
pub struct ContentStore {
    content_dir: PathBuf,
    /// Ambience registry, used to flag system pages naming unknown tracks
    registry: TrackRegistry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DevlogFrontMatter {
    title: Option<String>,
    date: Option<String>,
    summary: String,
    order: Option<i64>,
    title_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoreFrontMatter {
    title: Option<String>,
    category: LoreCategory,
    summary: String,
    order: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SystemFrontMatter {
    title: Option<String>,
    summary: String,
    order: Option<i64>,
    ost: Option<String>,
}

impl ContentStore {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            registry: TrackRegistry::site_default(),
        }
    }

    /// All devlogs, sorted by their `order` field
    pub fn devlogs(&self) -> Result<Vec<Devlog>> {
        let mut devlogs = Vec::new();
        for (index, (id, raw)) in self.scan("devlogs")?.into_iter().enumerate() {
            match build_devlog(&id, &raw, index as i64) {
                Ok(devlog) => devlogs.push(devlog),
                Err(err) => warn!("skipping devlog {id:?}: {err}"),
            }
        }
        devlogs.sort_by_key(|d| d.order);
        Ok(devlogs)
    }

    /// One devlog by id, `None` when absent or malformed
    pub fn devlog(&self, id: &str) -> Result<Option<Devlog>> {
        let Some(raw) = self.read_by_id("devlogs", id)? else {
            return Ok(None);
        };
        match build_devlog(id, &raw, 0) {
            Ok(devlog) => Ok(Some(devlog)),
            Err(err) => {
                warn!("devlog {id:?} is malformed: {err}");
                Ok(None)
            }
        }
    }

    /// All lore entries, sorted by their `order` field
    pub fn lore(&self) -> Result<Vec<LoreEntry>> {
        let mut entries = Vec::new();
        for (index, (id, raw)) in self.scan("lore")?.into_iter().enumerate() {
            match build_lore(&id, &raw, index as i64) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!("skipping lore entry {id:?}: {err}"),
            }
        }
        entries.sort_by_key(|e| e.order);
        Ok(entries)
    }

    /// One lore entry by id
    pub fn lore_entry(&self, id: &str) -> Result<Option<LoreEntry>> {
        let Some(raw) = self.read_by_id("lore", id)? else {
            return Ok(None);
        };
        match build_lore(id, &raw, 0) {
            Ok(entry) => Ok(Some(entry)),
            Err(err) => {
                warn!("lore entry {id:?} is malformed: {err}");
                Ok(None)
            }
        }
    }

    /// All system documentation pages, sorted by their `order` field
    pub fn systems(&self) -> Result<Vec<SystemDoc>> {
        let mut docs = Vec::new();
        for (index, (id, raw)) in self.scan("systems")?.into_iter().enumerate() {
            match build_system(&id, &raw, index as i64) {
                Ok(doc) => {
                    self.check_ost(&doc);
                    docs.push(doc);
                }
                Err(err) => warn!("skipping system doc {id:?}: {err}"),
            }
        }
        docs.sort_by_key(|d| d.order);
        Ok(docs)
    }

    /// One system documentation page by id
    pub fn system(&self, id: &str) -> Result<Option<SystemDoc>> {
        let Some(raw) = self.read_by_id("systems", id)? else {
            return Ok(None);
        };
        match build_system(id, &raw, 0) {
            Ok(doc) => {
                self.check_ost(&doc);
                Ok(Some(doc))
            }
            Err(err) => {
                warn!("system doc {id:?} is malformed: {err}");
                Ok(None)
            }
        }
    }

    /// Gallery items from `gallery/gallery.json`
    pub fn gallery(&self) -> Result<Vec<GalleryItem>> {
        let path = self.content_dir.join("gallery").join("gallery.json");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)?;
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!("gallery.json is malformed: {err}");
                Ok(Vec::new())
            }
        }
    }

    /// Surface authoring mistakes: a system page naming a track the
    /// ambience registry does not know will never get its soundtrack.
    fn check_ost(&self, doc: &SystemDoc) {
        if let Some(ost) = &doc.ost {
            if self.registry.get(ost).is_none() {
                warn!(
                    "system {:?} names unknown ambience track {ost:?}",
                    doc.id
                );
            }
        }
    }

    /// `(id, raw)` pairs for every markdown file under a subdirectory, in
    /// filename order. A missing subdirectory is an empty collection.
    fn scan(&self, subdir: &str) -> Result<Vec<(String, String)>> {
        let dir = self.content_dir.join(subdir);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|ext| ext == "md").unwrap_or(false))
            .collect();
        paths.sort();

        let mut documents = Vec::new();
        for path in paths {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read_to_string(&path) {
                Ok(raw) => documents.push((id.to_string(), raw)),
                Err(err) => warn!("could not read {}: {err}", path.display()),
            }
        }
        Ok(documents)
    }

    fn read_by_id(&self, subdir: &str, id: &str) -> Result<Option<String>> {
        if !is_valid_id(id) {
            debug!("rejecting content id {id:?}");
            return Ok(None);
        }
        let path = self.content_dir.join(subdir).join(format!("{id}.md"));
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }
}

fn build_devlog(id: &str, raw: &str, scan_index: i64) -> Result<Devlog> {
    let (meta, body) = parse_front_matter::<DevlogFrontMatter>(raw)?;
    Ok(Devlog {
        id: id.to_string(),
        title: meta.title.unwrap_or_else(|| id.to_string()),
        date: parse_date(id, meta.date.as_deref()),
        summary: meta.summary,
        content: body,
        order: meta.order.unwrap_or(scan_index),
        title_color: meta.title_color,
    })
}

fn build_lore(id: &str, raw: &str, scan_index: i64) -> Result<LoreEntry> {
    let (meta, body) = parse_front_matter::<LoreFrontMatter>(raw)?;
    Ok(LoreEntry {
        id: id.to_string(),
        title: meta.title.unwrap_or_else(|| id.to_string()),
        category: meta.category,
        summary: meta.summary,
        content: body,
        order: meta.order.unwrap_or(scan_index),
    })
}

fn build_system(id: &str, raw: &str, scan_index: i64) -> Result<SystemDoc> {
    let (meta, body) = parse_front_matter::<SystemFrontMatter>(raw)?;
    Ok(SystemDoc {
        id: id.to_string(),
        title: meta.title.unwrap_or_else(|| id.to_string()),
        summary: meta.summary,
        content: body,
        order: meta.order.unwrap_or(scan_index),
        ost: meta.ost,
    })
}

/// Split `+++` TOML front matter from the markdown body and parse it.
/// Documents without a front-matter fence get all-default metadata.
fn parse_front_matter<M: DeserializeOwned + Default>(raw: &str) -> Result<(M, String)> {
    match split_front_matter(raw) {
        Some((meta, body)) => {
            let meta = toml::from_str(meta)
                .map_err(|err| SiteError::Content(format!("front matter: {err}")))?;
            Ok((meta, body.to_string()))
        }
        None => Ok((M::default(), raw.to_string())),
    }
}

fn split_front_matter(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("+++")?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;
    let end = rest.find("\n+++")?;
    let meta = &rest[..end];
    let body = rest[end + 4..].trim_start_matches(['\r', '\n']);
    Some((meta, body))
}

fn parse_date(id: &str, date: Option<&str>) -> Option<NaiveDate> {
    let date = date?;
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!("devlog {id:?} has unparseable date {date:?}: {err}");
            None
        }
    }
}

/// Ids come from URL segments; keep them to filename-safe characters
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
