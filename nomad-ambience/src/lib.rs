//! # Nomad Protocol ambience (nomad-ambience)
//!
//! Ambient audio for the Nomad Protocol site: two alternating playback
//! channels crossfade background music as navigation moves between site
//! zones, with autoplay-policy recovery, a persisted mute preference, and
//! strictly serialized state mutation.
//!
//! **Architecture:** a single [`AudioManager`] service object owns both
//! channels and the shared processing graph; playback mechanics live behind
//! the [`graph`] traits with device output via rodio ([`output`]) and a
//! deterministic simulation ([`sim`]) for tests and headless use.

pub mod channel;
pub mod config;
pub mod error;
pub mod graph;
pub mod manager;
pub mod output;
pub mod sim;
pub mod store;
pub mod tracks;

pub use config::AmbienceConfig;
pub use error::{AmbienceError, Result};
pub use manager::{AudioManager, MuteListener, Subscription};
pub use output::RodioBackend;
pub use sim::SimBackend;
pub use store::SettingsStore;
pub use tracks::{Track, TrackRegistry, DEFAULT_TRACK_ID};
