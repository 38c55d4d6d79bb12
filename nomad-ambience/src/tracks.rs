//! Ambient track registry and route resolution
//!
//! Maps track ids to immutable track descriptors and navigation routes to
//! track ids via longest-prefix match. Every registry carries a `"default"`
//! entry used as the fallback for unmapped routes.

use crate::error::{AmbienceError, Result};
use std::collections::HashMap;

/// Track id guaranteed to exist in every registry
pub const DEFAULT_TRACK_ID: &str = "default";

/// Immutable descriptor for one ambient track
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Source location, resolved by the audio backend (e.g. `/audio/site_ost.mp3`)
    pub source: String,

    /// Playback volume in `[0.0, 1.0]`
    pub volume: f32,

    /// Whether the track loops when it reaches the end
    pub looping: bool,
}

impl Track {
    /// Looping track at the given source and volume
    pub fn looping(source: impl Into<String>, volume: f32) -> Self {
        Self {
            source: source.into(),
            volume,
            looping: true,
        }
    }
}

/// Static registry of ambient tracks plus the route-prefix mapping
#[derive(Debug, Clone)]
pub struct TrackRegistry {
    tracks: HashMap<String, Track>,
    routes: Vec<(String, String)>,
}

impl TrackRegistry {
    /// Build a registry from a track table and a route-prefix table.
    ///
    /// Fails when the `"default"` entry is missing, when a route maps to an
    /// unregistered track id, or when any volume falls outside `[0.0, 1.0]`.
    pub fn new(
        tracks: HashMap<String, Track>,
        routes: Vec<(String, String)>,
    ) -> Result<Self> {
        if !tracks.contains_key(DEFAULT_TRACK_ID) {
            return Err(AmbienceError::Registry(format!(
                "registry is missing the required {:?} track",
                DEFAULT_TRACK_ID
            )));
        }

        for (id, track) in &tracks {
            if !(0.0..=1.0).contains(&track.volume) {
                return Err(AmbienceError::Registry(format!(
                    "track {:?} has volume {} outside [0.0, 1.0]",
                    id, track.volume
                )));
            }
        }

        for (prefix, id) in &routes {
            if !tracks.contains_key(id) {
                return Err(AmbienceError::Registry(format!(
                    "route {:?} maps to unregistered track {:?}",
                    prefix, id
                )));
            }
        }

        Ok(Self { tracks, routes })
    }

    /// The registry used by the Nomad Protocol site
    pub fn site_default() -> Self {
        let tracks = HashMap::from([
            (
                "default".to_string(),
                Track::looping("/audio/site_ost.mp3", 0.5),
            ),
            (
                "devlogs".to_string(),
                Track::looping("/audio/devlogs.mp3", 0.5),
            ),
            (
                "systems".to_string(),
                Track::looping("/audio/systems.mp3", 0.5),
            ),
            (
                "archives".to_string(),
                Track::looping("/audio/archives.mp3", 0.5),
            ),
            (
                "gallery".to_string(),
                Track::looping("/audio/gallery.mp3", 0.5),
            ),
        ]);

        let routes = vec![
            ("/".to_string(), "default".to_string()),
            ("/devlogs".to_string(), "devlogs".to_string()),
            ("/systems".to_string(), "systems".to_string()),
            ("/lore".to_string(), "archives".to_string()),
            ("/gallery".to_string(), "gallery".to_string()),
        ];

        Self::new(tracks, routes).expect("built-in registry is valid")
    }

    /// Look up a track by id
    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.get(id)
    }

    /// The guaranteed fallback track
    pub fn default_track(&self) -> &Track {
        &self.tracks[DEFAULT_TRACK_ID]
    }

    /// Resolve a navigation route to a track id.
    ///
    /// Exact matches win; otherwise the longest non-root route prefix wins;
    /// otherwise `"default"`.
    pub fn resolve_route(&self, route: &str) -> &str {
        if let Some((_, id)) = self.routes.iter().find(|(prefix, _)| prefix == route) {
            return id;
        }

        self.routes
            .iter()
            .filter(|(prefix, _)| prefix != "/" && route.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, id)| id.as_str())
            .unwrap_or(DEFAULT_TRACK_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_registry_has_all_tracks() {
        let registry = TrackRegistry::site_default();
        for id in ["default", "devlogs", "systems", "archives", "gallery"] {
            assert!(registry.get(id).is_some(), "missing {id}");
        }
    }

    #[test]
    fn resolve_exact_route() {
        let registry = TrackRegistry::site_default();
        assert_eq!(registry.resolve_route("/devlogs"), "devlogs");
        assert_eq!(registry.resolve_route("/lore"), "archives");
        assert_eq!(registry.resolve_route("/"), "default");
    }

    #[test]
    fn resolve_prefix_route() {
        let registry = TrackRegistry::site_default();
        assert_eq!(registry.resolve_route("/devlogs/017-rations"), "devlogs");
        assert_eq!(registry.resolve_route("/systems/navigation"), "systems");
    }

    #[test]
    fn unmapped_route_falls_back_to_default() {
        let registry = TrackRegistry::site_default();
        assert_eq!(registry.resolve_route("/manifest"), "default");
        assert_eq!(registry.resolve_route(""), "default");
    }

    #[test]
    fn registry_requires_default_entry() {
        let tracks = HashMap::from([("menu".to_string(), Track::looping("/a.mp3", 0.5))]);
        assert!(TrackRegistry::new(tracks, vec![]).is_err());
    }

    #[test]
    fn registry_rejects_out_of_range_volume() {
        let tracks = HashMap::from([
            ("default".to_string(), Track::looping("/a.mp3", 1.5)),
        ]);
        assert!(TrackRegistry::new(tracks, vec![]).is_err());
    }

    #[test]
    fn registry_rejects_dangling_route() {
        let tracks = HashMap::from([
            ("default".to_string(), Track::looping("/a.mp3", 0.5)),
        ]);
        let routes = vec![("/x".to_string(), "missing".to_string())];
        assert!(TrackRegistry::new(tracks, routes).is_err());
    }
}
