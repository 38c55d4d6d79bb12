//! Simulated audio backend
//!
//! Deterministic in-process backend for the test suite and headless runs.
//! Models the runtime behaviors the manager has to cope with: an autoplay
//! policy that rejects playback until a user gesture, a pipeline that stays
//! suspended until resumed after that gesture, buffering delays, and
//! forced play failures.
//!
//! Channel and gain state is observable from outside through
//! [`SimBackend::channels`], so tests can assert on what would actually be
//! audible.

use crate::graph::{
    AudioBackend, AudioGraph, ChannelHandles, GainNode, GraphError, GraphState, MediaChannel,
    PlayError,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Point-in-time view of one simulated channel, for test assertions
#[derive(Debug, Clone)]
pub struct ChannelSnapshot {
    pub source: Option<String>,
    pub playing: bool,
    pub position: f64,
    pub gain: f32,
    /// Number of `load` calls this channel has seen
    pub loads: u32,
    /// Number of play attempts, successful or not
    pub attempts: u32,
    /// Number of successful play starts
    pub plays: u32,
}

struct ChannelState {
    source: Option<String>,
    playing: bool,
    base_position: f64,
    started_at: f64,
    ready_at: f64,
    loads: u32,
    attempts: u32,
    plays: u32,
}

struct Ramp {
    from: f32,
    to: f32,
    start: f64,
    end: f64,
}

struct GainState {
    value: f32,
    ramp: Option<Ramp>,
}

impl GainState {
    fn effective(&self, now: f64) -> f32 {
        match &self.ramp {
            Some(ramp) if now >= ramp.end => ramp.to,
            Some(ramp) if now <= ramp.start => ramp.from,
            Some(ramp) => {
                let progress = ((now - ramp.start) / (ramp.end - ramp.start)) as f32;
                ramp.from + (ramp.to - ramp.from) * progress
            }
            None => self.value,
        }
    }
}

struct SimInner {
    epoch: Instant,
    enforce_policy: bool,
    gesture_seen: AtomicBool,
    suspended: AtomicBool,
    allow_play: AtomicBool,
    refuse_graph: AtomicBool,
    denied_sources: Mutex<HashSet<String>>,
    ready_delay: Mutex<Duration>,
    channels: Mutex<Vec<Arc<Mutex<ChannelState>>>>,
    gains: Mutex<Vec<Arc<Mutex<GainState>>>>,
    graphs_opened: AtomicUsize,
}

impl SimInner {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Scriptable backend for tests and headless runs
pub struct SimBackend {
    inner: Arc<SimInner>,
    gesture_tx: watch::Sender<bool>,
    gesture_rx: watch::Receiver<bool>,
}

impl SimBackend {
    /// Backend with the browser-like autoplay policy: playback and pipeline
    /// resume are refused until [`user_gesture`] is called.
    ///
    /// [`user_gesture`]: SimBackend::user_gesture
    pub fn new() -> Self {
        Self::with_policy(true)
    }

    /// Backend without an autoplay policy: plays succeed immediately and
    /// the pipeline starts running
    pub fn permissive() -> Self {
        Self::with_policy(false)
    }

    fn with_policy(enforce_policy: bool) -> Self {
        let (gesture_tx, gesture_rx) = watch::channel(!enforce_policy);
        Self {
            inner: Arc::new(SimInner {
                epoch: Instant::now(),
                enforce_policy,
                gesture_seen: AtomicBool::new(!enforce_policy),
                suspended: AtomicBool::new(enforce_policy),
                allow_play: AtomicBool::new(true),
                refuse_graph: AtomicBool::new(false),
                denied_sources: Mutex::new(HashSet::new()),
                ready_delay: Mutex::new(Duration::ZERO),
                channels: Mutex::new(Vec::new()),
                gains: Mutex::new(Vec::new()),
                graphs_opened: AtomicUsize::new(0),
            }),
            gesture_tx,
            gesture_rx,
        }
    }

    /// Deliver the first qualifying user gesture
    pub fn user_gesture(&self) {
        self.inner.gesture_seen.store(true, Ordering::Release);
        let _ = self.gesture_tx.send(true);
    }

    /// Make every subsequent play attempt fail outright
    pub fn deny_playback(&self) {
        self.inner.allow_play.store(false, Ordering::Release);
    }

    /// Allow play attempts again after [`deny_playback`]
    ///
    /// [`deny_playback`]: SimBackend::deny_playback
    pub fn allow_playback(&self) {
        self.inner.allow_play.store(true, Ordering::Release);
    }

    /// Make play attempts fail for one specific source, leaving other
    /// channels able to resume
    pub fn deny_source(&self, source: &str) {
        lock(&self.inner.denied_sources).insert(source.to_string());
    }

    /// Lift a [`deny_source`] denial
    ///
    /// [`deny_source`]: SimBackend::deny_source
    pub fn allow_source(&self, source: &str) {
        lock(&self.inner.denied_sources).remove(source);
    }

    /// Make graph construction fail, to exercise degraded operation
    pub fn refuse_graph(&self) {
        self.inner.refuse_graph.store(true, Ordering::Release);
    }

    /// Simulated buffering delay applied by each `load`
    pub fn set_ready_delay(&self, delay: Duration) {
        *lock(&self.inner.ready_delay) = delay;
    }

    /// Snapshots of every channel created so far, in creation order
    pub fn channels(&self) -> Vec<ChannelSnapshot> {
        let now = self.inner.now();
        let channels = lock(&self.inner.channels);
        let gains = lock(&self.inner.gains);
        channels
            .iter()
            .zip(gains.iter())
            .map(|(channel, gain)| {
                let state = lock(channel);
                let position = if state.playing {
                    state.base_position + (now - state.started_at)
                } else {
                    state.base_position
                };
                ChannelSnapshot {
                    source: state.source.clone(),
                    playing: state.playing,
                    position,
                    gain: lock(gain).effective(now),
                    loads: state.loads,
                    attempts: state.attempts,
                    plays: state.plays,
                }
            })
            .collect()
    }

    /// Total `load` calls across all channels
    pub fn total_loads(&self) -> u32 {
        self.channels().iter().map(|c| c.loads).sum()
    }

    /// Number of graphs opened (idempotent initialization should keep this
    /// at one)
    pub fn graphs_opened(&self) -> usize {
        self.inner.graphs_opened.load(Ordering::Acquire)
    }
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for SimBackend {
    fn open_graph(&self) -> Result<Arc<dyn AudioGraph>, GraphError> {
        if self.inner.refuse_graph.load(Ordering::Acquire) {
            return Err(GraphError::Device("simulated device failure".into()));
        }
        self.inner.graphs_opened.fetch_add(1, Ordering::AcqRel);
        Ok(Arc::new(SimGraph {
            inner: Arc::clone(&self.inner),
        }))
    }

    fn first_gesture(&self) -> watch::Receiver<bool> {
        self.gesture_rx.clone()
    }
}

struct SimGraph {
    inner: Arc<SimInner>,
}

impl AudioGraph for SimGraph {
    fn now(&self) -> f64 {
        self.inner.now()
    }

    fn state(&self) -> GraphState {
        if self.inner.suspended.load(Ordering::Acquire) {
            GraphState::Suspended
        } else {
            GraphState::Running
        }
    }

    fn resume(&self) -> Result<(), GraphError> {
        if self.inner.enforce_policy && !self.inner.gesture_seen.load(Ordering::Acquire) {
            return Err(GraphError::Suspended);
        }
        self.inner.suspended.store(false, Ordering::Release);
        Ok(())
    }

    fn prime(&self) -> Result<(), GraphError> {
        if self.inner.suspended.load(Ordering::Acquire) {
            return Err(GraphError::Suspended);
        }
        Ok(())
    }

    fn create_channel(&self) -> Result<ChannelHandles, GraphError> {
        let channel_state = Arc::new(Mutex::new(ChannelState {
            source: None,
            playing: false,
            base_position: 0.0,
            started_at: 0.0,
            ready_at: 0.0,
            loads: 0,
            attempts: 0,
            plays: 0,
        }));
        let gain_state = Arc::new(Mutex::new(GainState {
            value: 1.0,
            ramp: None,
        }));

        lock(&self.inner.channels).push(Arc::clone(&channel_state));
        lock(&self.inner.gains).push(Arc::clone(&gain_state));

        Ok(ChannelHandles {
            media: Box::new(SimChannel {
                inner: Arc::clone(&self.inner),
                state: channel_state,
                source: None,
            }),
            gain: Some(Box::new(SimGain {
                inner: Arc::clone(&self.inner),
                state: gain_state,
            })),
        })
    }
}

struct SimChannel {
    inner: Arc<SimInner>,
    state: Arc<Mutex<ChannelState>>,
    /// Mirror of the shared source for borrowing out of `source()`
    source: Option<String>,
}

impl MediaChannel for SimChannel {
    fn load(&mut self, source: &str, _looping: bool) {
        self.source = Some(source.to_string());
        let ready_at = self.inner.now() + lock(&self.inner.ready_delay).as_secs_f64();
        let mut state = lock(&self.state);
        state.source = Some(source.to_string());
        state.playing = false;
        state.base_position = 0.0;
        state.ready_at = ready_at;
        state.loads += 1;
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn is_ready(&self) -> bool {
        self.inner.now() >= lock(&self.state).ready_at
    }

    fn try_play(&mut self) -> Result<(), PlayError> {
        lock(&self.state).attempts += 1;
        if !self.inner.allow_play.load(Ordering::Acquire) {
            return Err(PlayError::Failed("playback refused".into()));
        }
        if let Some(source) = &self.source {
            if lock(&self.inner.denied_sources).contains(source) {
                return Err(PlayError::Failed(format!("source {source:?} refused")));
            }
        }
        if self.inner.enforce_policy && !self.inner.gesture_seen.load(Ordering::Acquire) {
            return Err(PlayError::Blocked);
        }
        let now = self.inner.now();
        let mut state = lock(&self.state);
        if !state.playing {
            state.playing = true;
            state.started_at = now;
            state.plays += 1;
        }
        Ok(())
    }

    fn pause(&mut self) {
        let now = self.inner.now();
        let mut state = lock(&self.state);
        if state.playing {
            state.base_position += now - state.started_at;
            state.playing = false;
        }
    }

    fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    fn position(&self) -> f64 {
        let now = self.inner.now();
        let state = lock(&self.state);
        if state.playing {
            state.base_position + (now - state.started_at)
        } else {
            state.base_position
        }
    }

    fn seek(&mut self, seconds: f64) {
        let now = self.inner.now();
        let mut state = lock(&self.state);
        state.base_position = seconds.max(0.0);
        if state.playing {
            state.started_at = now;
        }
    }
}

struct SimGain {
    inner: Arc<SimInner>,
    state: Arc<Mutex<GainState>>,
}

impl GainNode for SimGain {
    fn value(&self) -> f32 {
        let now = self.inner.now();
        lock(&self.state).effective(now)
    }

    fn set(&mut self, value: f32) {
        let mut state = lock(&self.state);
        state.ramp = None;
        state.value = value;
    }

    fn ramp_to(&mut self, target: f32, duration: Duration) {
        let now = self.inner.now();
        let mut state = lock(&self.state);
        let from = state.effective(now);
        state.value = target;
        state.ramp = Some(Ramp {
            from,
            to: target,
            start: now,
            end: now + duration.as_secs_f64(),
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_blocked_until_gesture() {
        let backend = SimBackend::new();
        let graph = backend.open_graph().unwrap();
        let mut handles = graph.create_channel().unwrap();

        handles.media.load("/audio/a.mp3", true);
        assert!(matches!(
            handles.media.try_play(),
            Err(PlayError::Blocked)
        ));

        backend.user_gesture();
        assert!(handles.media.try_play().is_ok());
        assert!(handles.media.is_playing());
    }

    #[test]
    fn resume_requires_gesture() {
        let backend = SimBackend::new();
        let graph = backend.open_graph().unwrap();

        assert_eq!(graph.state(), GraphState::Suspended);
        assert!(graph.resume().is_err());

        backend.user_gesture();
        assert!(graph.resume().is_ok());
        assert_eq!(graph.state(), GraphState::Running);
    }

    #[test]
    fn pause_preserves_position() {
        let backend = SimBackend::permissive();
        let graph = backend.open_graph().unwrap();
        let mut handles = graph.create_channel().unwrap();

        handles.media.load("/audio/a.mp3", true);
        handles.media.try_play().unwrap();
        std::thread::sleep(Duration::from_millis(30));
        handles.media.pause();

        let frozen = handles.media.position();
        assert!(frozen > 0.0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(handles.media.position(), frozen);
    }

    #[test]
    fn gain_ramp_interpolates() {
        let backend = SimBackend::permissive();
        let graph = backend.open_graph().unwrap();
        let mut handles = graph.create_channel().unwrap();
        let gain = handles.gain.as_mut().unwrap();

        gain.set(0.0);
        gain.ramp_to(1.0, Duration::from_millis(50));
        std::thread::sleep(Duration::from_millis(25));
        let mid = gain.value();
        assert!(mid > 0.0 && mid < 1.0, "mid-ramp gain was {mid}");

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(gain.value(), 1.0);
    }
}
