//! Ambience manager
//!
//! Owns the two playback channels and the crossfade/mute/autoplay state
//! machine. One instance exists per application session; clones are handles
//! onto the same instance.
//!
//! Concurrency model: every mutating operation locks the channel deck, so
//! at most one operation mutates playback state at a time, and context
//! switches carry a sequence token that is re-checked at every await point
//! so a superseded transition abandons itself without further mutation.

use crate::channel::{other, Channel};
use crate::config::AmbienceConfig;
use crate::error::Result;
use crate::graph::{AudioBackend, AudioGraph, GraphError, GraphState};
use crate::store::SettingsStore;
use crate::tracks::{Track, TrackRegistry, DEFAULT_TRACK_ID};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, Weak};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Listener invoked with the mute flag on every mute-state change
pub type MuteListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle returned by [`AudioManager::subscribe`].
///
/// `unsubscribe` is idempotent and remains safe after the manager is gone.
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(shared) = self.shared.upgrade() {
            lock_poisonless(&shared.subscribers).retain(|(id, _)| *id != self.id);
        }
    }
}

/// Channel deck: everything a transition mutates, behind one lock
struct Deck {
    graph: Option<Arc<dyn AudioGraph>>,
    channels: Option<[Channel; 2]>,
    active: usize,
    /// Per-track resume positions, so returning to a track picks up near
    /// where it left off
    resume_positions: HashMap<String, f64>,
}

struct Shared {
    registry: TrackRegistry,
    config: AmbienceConfig,
    backend: Arc<dyn AudioBackend>,
    store: SettingsStore,
    deck: Mutex<Deck>,
    current_track: StdMutex<String>,
    muted: AtomicBool,
    autoplay_blocked: AtomicBool,
    initialized: AtomicBool,
    unlocked: AtomicBool,
    /// Transition sequence counter; a transition holding an older token is
    /// superseded and must stop mutating
    sequence: AtomicU64,
    subscribers: StdMutex<Vec<(u64, MuteListener)>>,
    next_subscription: AtomicU64,
}

/// The ambient audio service.
///
/// Cheap to clone; all clones share one underlying instance.
#[derive(Clone)]
pub struct AudioManager {
    shared: Arc<Shared>,
}

impl AudioManager {
    /// Construct the manager, restoring the persisted mute preference.
    ///
    /// Does not touch the audio device; that happens in [`initialize`].
    ///
    /// [`initialize`]: AudioManager::initialize
    pub async fn new(
        registry: TrackRegistry,
        config: AmbienceConfig,
        backend: Arc<dyn AudioBackend>,
        store: SettingsStore,
    ) -> Result<Self> {
        let muted = match store.get_muted().await {
            Ok(muted) => muted,
            Err(err) => {
                warn!("could not restore mute preference: {err}");
                false
            }
        };

        Ok(Self {
            shared: Arc::new(Shared {
                registry,
                config,
                backend,
                store,
                deck: Mutex::new(Deck {
                    graph: None,
                    channels: None,
                    active: 0,
                    resume_positions: HashMap::new(),
                }),
                current_track: StdMutex::new(DEFAULT_TRACK_ID.to_string()),
                muted: AtomicBool::new(muted),
                autoplay_blocked: AtomicBool::new(false),
                initialized: AtomicBool::new(false),
                unlocked: AtomicBool::new(false),
                sequence: AtomicU64::new(0),
                subscribers: StdMutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
            }),
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Bring up the audio pipeline. Idempotent; a no-op after the first
    /// successful call.
    ///
    /// Opens the shared graph, stages the default track into both channels
    /// with gains at zero, registers the one-shot first-gesture listener,
    /// and, when unmuted, makes an immediate play attempt that is expected
    /// to be rejected by autoplay policy (the rejection latches
    /// `autoplay_blocked` and notifies subscribers).
    pub async fn initialize(&self) -> Result<()> {
        if self.shared.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        let mut deck = self.shared.deck.lock().await;
        if self.shared.initialized.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        match self.shared.backend.open_graph() {
            Ok(graph) => {
                let default = self.shared.registry.default_track().clone();
                let built = (|| -> std::result::Result<[Channel; 2], GraphError> {
                    Ok([
                        Channel::new(graph.create_channel()?, &default, DEFAULT_TRACK_ID),
                        Channel::new(graph.create_channel()?, &default, DEFAULT_TRACK_ID),
                    ])
                })();
                match built {
                    Ok(channels) => {
                        deck.channels = Some(channels);
                        deck.graph = Some(graph);
                    }
                    Err(err) => warn!("channel construction failed, ambience disabled: {err}"),
                }
            }
            Err(err) => warn!("audio graph unavailable, ambience disabled: {err}"),
        }

        // One-shot first-gesture listener; the task exits after delivery.
        let manager = self.clone();
        let mut gesture = self.shared.backend.first_gesture();
        tokio::spawn(async move {
            if gesture.wait_for(|fired| *fired).await.is_ok() {
                manager.on_first_gesture().await;
            }
        });

        if deck.graph.is_some() && !self.is_muted() {
            self.attempt_start(&mut deck, true);
        }

        info!("ambience manager initialized");
        Ok(())
    }

    /// First qualifying user gesture: unlock the pipeline, then start
    /// whatever track is currently designated as current.
    async fn on_first_gesture(&self) {
        debug!("first user gesture received");
        let mut deck = self.shared.deck.lock().await;

        if let Some(graph) = deck.graph.clone() {
            self.unlock(&graph);
        }

        let already_playing = deck
            .channels
            .as_ref()
            .map(|channels| channels[deck.active].media.is_playing())
            .unwrap_or(true);
        if !self.is_muted() && !already_playing {
            self.attempt_start(&mut deck, true);
        }
    }

    /// One-time pipeline unlock: resume a suspended graph and emit an
    /// inaudible priming pulse. Latches only on success; safe to call
    /// redundantly.
    fn unlock(&self, graph: &Arc<dyn AudioGraph>) {
        if self.shared.unlocked.load(Ordering::Acquire) {
            return;
        }
        if graph.state() == GraphState::Suspended {
            if let Err(err) = graph.resume() {
                debug!("pipeline resume refused: {err}");
                return;
            }
        }
        if let Err(err) = graph.prime() {
            debug!("pipeline priming failed: {err}");
            return;
        }
        self.shared.unlocked.store(true, Ordering::Release);
        debug!("audio pipeline unlocked");
    }

    // ------------------------------------------------------------------
    // Context switching
    // ------------------------------------------------------------------

    /// React to a navigation: resolve the route to a track and crossfade
    /// to it. Repeated navigation within the same zone is a no-op.
    pub async fn set_context(&self, route: &str) -> Result<()> {
        self.initialize().await?;

        let track_id = self.shared.registry.resolve_route(route).to_string();
        if track_id == self.current_track_id() {
            return Ok(());
        }
        debug!(route, track = %track_id, "route context change");
        self.crossfade_to(&track_id).await
    }

    /// Explicit track override from content metadata. Unknown ids are
    /// rejected with a log line so authoring mistakes surface.
    pub async fn set_track_by_id(&self, track_id: &str) -> Result<()> {
        self.initialize().await?;

        if self.shared.registry.get(track_id).is_none() {
            warn!("audio track {track_id:?} is not registered; ignoring");
            return Ok(());
        }
        if track_id == self.current_track_id() {
            return Ok(());
        }
        self.crossfade_to(track_id).await
    }

    /// Convenience: return to the root route's track
    pub async fn reset_to_default(&self) -> Result<()> {
        self.set_context("/").await
    }

    /// Crossfade the deck to `track_id`.
    ///
    /// Takes a fresh sequence token up front; any later context switch
    /// supersedes this one, which then abandons itself at the next await.
    async fn crossfade_to(&self, track_id: &str) -> Result<()> {
        let token = self.shared.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        let mut guard = self.shared.deck.lock().await;
        if self.superseded(token) {
            debug!("transition to {track_id:?} superseded before it began");
            return Ok(());
        }
        if self.current_track_id() == track_id {
            return Ok(());
        }
        let Some(track) = self.shared.registry.get(track_id).cloned() else {
            warn!("audio track {track_id:?} vanished from registry");
            return Ok(());
        };

        let deck = &mut *guard;
        let (Some(graph), Some(channels)) = (deck.graph.clone(), deck.channels.as_mut())
        else {
            // No pipeline: keep the logical track in step with the route.
            self.set_current(track_id);
            return Ok(());
        };

        self.unlock(&graph);

        let active = deck.active;
        let inactive = other(active);

        // Stage the incoming track, remembering where the track it evicts
        // left off and restoring this track's own remembered position.
        if !channels[inactive].holds(&track, track_id) {
            let evicted_id = channels[inactive].track_id.clone();
            let evicted_pos = channels[inactive].media.position();
            if !evicted_id.is_empty() {
                deck.resume_positions.insert(evicted_id, evicted_pos);
            }
            channels[inactive].load(&track, track_id);
        }
        if let Some(pos) = deck.resume_positions.get(track_id).copied() {
            channels[inactive].media.seek(pos);
        }
        channels[inactive].set_gain(0.0);

        // Bounded buffering wait; timeout means proceed anyway.
        let deadline = Instant::now() + self.shared.config.ready_timeout;
        while !channels[inactive].media.is_ready() {
            if Instant::now() >= deadline {
                debug!("readiness wait for {track_id:?} timed out, proceeding");
                break;
            }
            tokio::time::sleep(self.shared.config.ready_poll).await;
            if self.superseded(token) {
                debug!("transition to {track_id:?} superseded during buffering");
                return Ok(());
            }
        }

        let muted = self.is_muted();
        let pipeline_locked = graph.state() == GraphState::Suspended
            && !self.shared.unlocked.load(Ordering::Acquire);

        // Silent switch: audio cannot (or must not) sound right now, so
        // swap state without any play attempt.
        if muted || pipeline_locked || !channels[active].media.is_playing() {
            let out_id = channels[active].track_id.clone();
            deck.resume_positions
                .insert(out_id, channels[active].media.position());
            channels[active].media.pause();
            channels[active].media.seek(0.0);
            channels[active].set_gain(0.0);
            channels[inactive].set_gain(0.0);
            deck.active = inactive;
            self.set_current(track_id);
            if !muted {
                // Staged but needs a fresh gesture before it can sound.
                self.set_autoplay_blocked(true);
            }
            info!(track = %track_id, "silent track switch");
            return Ok(());
        }

        // Audible crossfade, first half: outgoing ramps to zero.
        let half = self.shared.config.fade / 2;
        let out_target = channels[active].gain_value();
        let fade_out_start = graph.now();
        channels[active].ramp_gain(0.0, half);
        if !self
            .wait_for_clock(&graph, fade_out_start + half.as_secs_f64(), token)
            .await
        {
            return Ok(());
        }

        // Outgoing stops; its resume position is recorded first.
        let out_pos = channels[active].media.position();
        deck.resume_positions
            .insert(channels[active].track_id.clone(), out_pos);
        channels[active].media.pause();
        channels[active].media.seek(0.0);

        // Start the incoming channel. On failure, roll back to the old
        // track rather than leaving neither channel configured.
        if let Err(err) = channels[inactive].media.try_play() {
            warn!("incoming track {track_id:?} failed to start: {err}");
            channels[inactive].media.pause();
            channels[inactive].set_gain(0.0);
            channels[active].media.seek(out_pos);
            if let Err(err) = channels[active].media.try_play() {
                debug!("outgoing channel could not resume: {err}");
            }
            channels[active].ramp_gain(out_target, self.shared.config.mute_ramp);
            self.set_autoplay_blocked(true);
            return Ok(());
        }

        // Second half: incoming ramps up to its configured volume.
        let fade_in_target = if self.is_muted() { 0.0 } else { track.volume };
        let fade_in_start = graph.now();
        channels[inactive].set_gain(0.0);
        channels[inactive].ramp_gain(fade_in_target, half);
        if !self
            .wait_for_clock(&graph, fade_in_start + half.as_secs_f64(), token)
            .await
        {
            return Ok(());
        }

        deck.active = inactive;
        self.set_current(track_id);
        self.set_autoplay_blocked(false);
        self.notify_subscribers();
        info!(track = %track_id, "crossfade complete");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mute and autoplay recovery
    // ------------------------------------------------------------------

    /// Flip and persist the mute preference.
    ///
    /// Muting ramps both channels down (one may be mid-crossfade) and then
    /// pauses them, preserving positions. Unmuting re-stages the current
    /// track if the active channel lost it, resumes playback, and ramps
    /// back up. Subscribers are notified in every branch.
    pub async fn toggle_mute(&self) -> Result<()> {
        let mut guard = self.shared.deck.lock().await;

        let muted = !self.shared.muted.load(Ordering::Acquire);
        self.shared.muted.store(muted, Ordering::Release);
        if let Err(err) = self.shared.store.set_muted(muted).await {
            warn!("failed to persist mute preference: {err}");
        }
        info!(muted, "mute toggled");

        let deck = &mut *guard;
        let (Some(graph), Some(channels)) = (deck.graph.clone(), deck.channels.as_mut())
        else {
            self.notify_subscribers();
            return Ok(());
        };

        self.unlock(&graph);

        if muted {
            for channel in channels.iter_mut() {
                channel.ramp_gain(0.0, self.shared.config.mute_ramp);
            }
            let until = graph.now() + self.shared.config.mute_ramp.as_secs_f64();
            while graph.now() < until {
                tokio::time::sleep(self.shared.config.clock_poll).await;
            }
            for channel in channels.iter_mut() {
                channel.media.pause();
            }
        } else {
            let current_id = self.current_track_id();
            let track = self
                .shared
                .registry
                .get(&current_id)
                .cloned()
                .unwrap_or_else(|| self.shared.registry.default_track().clone());

            let channel = &mut channels[deck.active];
            if channel.track_id != current_id
                || channel.media.source() != Some(track.source.as_str())
            {
                channel.load(&track, &current_id);
                if let Some(pos) = deck.resume_positions.get(&current_id).copied() {
                    channel.media.seek(pos);
                }
            }
            if !channel.media.is_playing() {
                match channel.media.try_play() {
                    Ok(()) => self.shared.autoplay_blocked.store(false, Ordering::Release),
                    Err(err) => {
                        warn!("resume after unmute failed: {err}");
                        self.shared.autoplay_blocked.store(true, Ordering::Release);
                    }
                }
            }
            channel.ramp_gain(track.volume, self.shared.config.mute_ramp);
        }

        self.notify_subscribers();
        Ok(())
    }

    /// Gesture-driven recovery from an autoplay block. Unlocks the
    /// pipeline and retries the active channel; success clears the blocked
    /// flag, failure leaves it set. Never fails toward the caller.
    pub async fn try_autoplay(&self) -> Result<()> {
        if !self.shared.initialized.load(Ordering::Acquire) {
            return self.initialize().await;
        }

        let mut guard = self.shared.deck.lock().await;
        let deck = &mut *guard;
        let (Some(graph), Some(channels)) = (deck.graph.clone(), deck.channels.as_mut())
        else {
            return Ok(());
        };

        self.unlock(&graph);

        let channel = &mut channels[deck.active];
        if channel.media.is_playing() {
            return Ok(());
        }
        match channel.media.try_play() {
            Ok(()) => {
                if !self.is_muted() {
                    let track = self.current_descriptor();
                    channel.set_gain(track.volume);
                }
                self.set_autoplay_blocked(false);
            }
            Err(err) => warn!("gesture-driven play attempt failed: {err}"),
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads and subscriptions
    // ------------------------------------------------------------------

    /// Current mute flag
    pub fn is_muted(&self) -> bool {
        self.shared.muted.load(Ordering::Acquire)
    }

    /// Whether the last play attempt was rejected by autoplay policy
    pub fn is_autoplay_blocked(&self) -> bool {
        self.shared.autoplay_blocked.load(Ordering::Acquire)
    }

    /// Id of the track currently designated as current
    pub fn current_track_id(&self) -> String {
        lock_poisonless(&self.shared.current_track).clone()
    }

    /// Register a mute-change listener.
    ///
    /// Listener identity is the `Arc` pointer: subscribing the same
    /// listener twice yields the original registration, so it is never
    /// invoked twice per change.
    pub fn subscribe(&self, listener: MuteListener) -> Subscription {
        let mut subscribers = lock_poisonless(&self.shared.subscribers);
        if let Some((id, _)) = subscribers
            .iter()
            .find(|(_, existing)| Arc::ptr_eq(existing, &listener))
        {
            return Subscription {
                id: *id,
                shared: Arc::downgrade(&self.shared),
            };
        }

        let id = self.shared.next_subscription.fetch_add(1, Ordering::AcqRel);
        subscribers.push((id, listener));
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Try to start the active channel; on success bring its gain to the
    /// current track's volume (unless muted) and clear the blocked flag.
    /// `latch_on_failure` records a rejection in the blocked flag.
    fn attempt_start(&self, deck: &mut Deck, latch_on_failure: bool) {
        let Some(channels) = deck.channels.as_mut() else {
            return;
        };
        let channel = &mut channels[deck.active];
        match channel.media.try_play() {
            Ok(()) => {
                if !self.is_muted() {
                    let track = self.current_descriptor();
                    channel.set_gain(track.volume);
                }
                self.set_autoplay_blocked(false);
            }
            Err(err) => {
                debug!("play attempt rejected: {err}");
                if latch_on_failure {
                    self.set_autoplay_blocked(true);
                }
            }
        }
    }

    /// Poll the pipeline clock until `until`, abandoning when superseded
    async fn wait_for_clock(&self, graph: &Arc<dyn AudioGraph>, until: f64, token: u64) -> bool {
        while graph.now() < until {
            tokio::time::sleep(self.shared.config.clock_poll).await;
            if self.superseded(token) {
                debug!("transition superseded mid-fade");
                return false;
            }
        }
        true
    }

    fn superseded(&self, token: u64) -> bool {
        self.shared.sequence.load(Ordering::Acquire) != token
    }

    fn set_current(&self, track_id: &str) {
        *lock_poisonless(&self.shared.current_track) = track_id.to_string();
    }

    /// Descriptor for the current track, falling back to the default
    fn current_descriptor(&self) -> Track {
        let current = self.current_track_id();
        self.shared
            .registry
            .get(&current)
            .cloned()
            .unwrap_or_else(|| self.shared.registry.default_track().clone())
    }

    fn set_autoplay_blocked(&self, blocked: bool) {
        if self.shared.autoplay_blocked.swap(blocked, Ordering::AcqRel) != blocked {
            self.notify_subscribers();
        }
    }

    fn notify_subscribers(&self) {
        let muted = self.is_muted();
        let listeners: Vec<MuteListener> = lock_poisonless(&self.shared.subscribers)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(muted);
        }
    }
}

/// Lock a std mutex, recovering the data from a poisoned lock. A listener
/// panicking must not take the whole manager down with it.
fn lock_poisonless<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
