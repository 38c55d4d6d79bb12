//! Audio backend seam
//!
//! The manager owns playback policy (what plays, when, how loud); these
//! traits own the mechanics. A backend supplies a shared processing graph
//! with its own clock, media channels that can be loaded and played, and
//! per-channel gain nodes for fade scheduling.
//!
//! Two implementations ship with the crate: [`crate::output::RodioBackend`]
//! for real device output and [`crate::sim::SimBackend`] for deterministic
//! headless runs and the test suite.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Runtime state of the shared processing graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// Pipeline is running and may produce sound
    Running,

    /// Pipeline is suspended pending a qualifying user gesture
    Suspended,
}

/// Errors from graph construction or node connection
#[derive(Error, Debug)]
pub enum GraphError {
    /// No usable output device / graph construction failed
    #[error("audio device unavailable: {0}")]
    Device(String),

    /// The pipeline refused to leave the suspended state
    #[error("audio pipeline is suspended")]
    Suspended,

    /// Connecting a node into the graph failed
    #[error("node connection failed: {0}")]
    Connection(String),
}

/// Errors from a playback start attempt
#[derive(Error, Debug)]
pub enum PlayError {
    /// The runtime's autoplay policy rejected the attempt; recoverable via
    /// a user gesture
    #[error("playback blocked pending user gesture")]
    Blocked,

    /// Any other start failure
    #[error("playback failed: {0}")]
    Failed(String),
}

/// One playable media handle.
///
/// Loading is asynchronous in spirit: `load` stages the source and
/// `is_ready` reports buffering readiness, which callers poll under their
/// own timeout policy.
pub trait MediaChannel: Send {
    /// Stage a new source in this channel. Resets position to zero and does
    /// not start playback.
    fn load(&mut self, source: &str, looping: bool);

    /// Source currently staged, if any
    fn source(&self) -> Option<&str>;

    /// Whether enough of the source is buffered to start cleanly
    fn is_ready(&self) -> bool;

    /// Attempt to start playback
    fn try_play(&mut self) -> Result<(), PlayError>;

    /// Pause playback, preserving position
    fn pause(&mut self);

    /// Whether the channel is actively producing samples
    fn is_playing(&self) -> bool;

    /// Current playback position in seconds
    fn position(&self) -> f64;

    /// Seek to a position in seconds
    fn seek(&mut self, seconds: f64);
}

/// Gain control for one channel.
///
/// Ramps are scheduled against the graph clock; scheduling a new ramp or
/// calling `set` replaces anything previously scheduled.
pub trait GainNode: Send {
    /// Current gain value
    fn value(&self) -> f32;

    /// Set gain immediately, cancelling any scheduled ramp
    fn set(&mut self, value: f32);

    /// Linearly ramp gain to `target` over `duration`, cancelling any
    /// previously scheduled ramp
    fn ramp_to(&mut self, target: f32, duration: Duration);
}

/// A media channel together with its connection into the graph.
///
/// `gain` is `None` when the node connection failed; callers treat that
/// channel as silent and skip gain operations rather than failing.
pub struct ChannelHandles {
    pub media: Box<dyn MediaChannel>,
    pub gain: Option<Box<dyn GainNode>>,
}

/// The shared audio processing graph
pub trait AudioGraph: Send + Sync {
    /// Pipeline clock in seconds. Fades are timed against this, not wall
    /// time.
    fn now(&self) -> f64;

    /// Current pipeline state
    fn state(&self) -> GraphState;

    /// Ask a suspended pipeline to resume. May legitimately fail before a
    /// user gesture has occurred.
    fn resume(&self) -> Result<(), GraphError>;

    /// Produce a few milliseconds of inaudible output. Some runtimes keep
    /// the pipeline suspended until a concrete produced-sound event occurs
    /// even after a gesture; this forces one. Safe to call redundantly.
    fn prime(&self) -> Result<(), GraphError>;

    /// Construct a media channel connected into this graph
    fn create_channel(&self) -> Result<ChannelHandles, GraphError>;
}

/// Factory for the processing graph plus the host's user-gesture signal
pub trait AudioBackend: Send + Sync {
    /// Construct the shared processing graph
    fn open_graph(&self) -> Result<Arc<dyn AudioGraph>, GraphError>;

    /// Receiver that flips to `true` on the first qualifying user gesture
    /// (pointer/touch/click at the host surface). Backends without an
    /// autoplay policy start it at `true`.
    fn first_gesture(&self) -> watch::Receiver<bool>;
}
