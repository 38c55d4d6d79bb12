//! nomad-ambience specific configuration

use std::time::Duration;

/// Timing knobs for the ambience manager.
///
/// Defaults match the site's tuning: a 1.5 s crossfade split into equal
/// fade-out/fade-in halves, a 0.3 s mute ramp, and a 1.2 s cap on waiting
/// for the incoming track to buffer before proceeding anyway.
#[derive(Debug, Clone)]
pub struct AmbienceConfig {
    /// Total crossfade duration (half out, half in)
    pub fade: Duration,

    /// Ramp used by mute/unmute and by post-failure gain recovery
    pub mute_ramp: Duration,

    /// Upper bound on waiting for buffering readiness; timeout means proceed
    pub ready_timeout: Duration,

    /// Poll interval while waiting on buffering readiness
    pub ready_poll: Duration,

    /// Poll interval while waiting on the pipeline clock during fades
    pub clock_poll: Duration,
}

impl Default for AmbienceConfig {
    fn default() -> Self {
        Self {
            fade: Duration::from_millis(1500),
            mute_ramp: Duration::from_millis(300),
            ready_timeout: Duration::from_millis(1200),
            ready_poll: Duration::from_millis(25),
            clock_poll: Duration::from_millis(10),
        }
    }
}
