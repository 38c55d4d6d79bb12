//! Playback channel pair
//!
//! Two channels alternate as a ping-pong double buffer: the active slot is
//! audible (or about to be) and the inactive slot stages the next track.
//! Slots are indexed 0/1 so active/inactive handling stays symmetric.

use crate::graph::{ChannelHandles, GainNode, MediaChannel};
use crate::tracks::Track;
use std::time::Duration;

/// One playback slot: a media handle, its (possibly absent) gain node, and
/// the id of the track staged in it.
pub struct Channel {
    pub(crate) media: Box<dyn MediaChannel>,
    pub(crate) gain: Option<Box<dyn GainNode>>,
    pub(crate) track_id: String,
}

impl Channel {
    /// Build a slot pre-loaded with `track`, gain zeroed to avoid a pop
    /// before the first fade-in.
    pub(crate) fn new(handles: ChannelHandles, track: &Track, track_id: &str) -> Self {
        let mut channel = Self {
            media: handles.media,
            gain: handles.gain,
            track_id: String::new(),
        };
        channel.load(track, track_id);
        channel
    }

    /// Stage `track` into this slot and zero its gain
    pub(crate) fn load(&mut self, track: &Track, track_id: &str) {
        self.media.load(&track.source, track.looping);
        self.track_id = track_id.to_string();
        self.set_gain(0.0);
    }

    /// Whether this slot already holds `track` under `track_id`
    pub(crate) fn holds(&self, track: &Track, track_id: &str) -> bool {
        self.track_id == track_id && self.media.source() == Some(track.source.as_str())
    }

    /// Set gain immediately; no-op when the gain node is absent
    pub(crate) fn set_gain(&mut self, value: f32) {
        if let Some(gain) = self.gain.as_mut() {
            gain.set(value);
        }
    }

    /// Schedule a gain ramp; no-op when the gain node is absent
    pub(crate) fn ramp_gain(&mut self, target: f32, duration: Duration) {
        if let Some(gain) = self.gain.as_mut() {
            gain.ramp_to(target, duration);
        }
    }

    /// Current gain, or 0.0 when the gain node is absent
    pub(crate) fn gain_value(&self) -> f32 {
        self.gain.as_ref().map(|g| g.value()).unwrap_or(0.0)
    }
}

/// The other slot of a 0/1 pair
pub(crate) fn other(slot: usize) -> usize {
    1 - slot
}
