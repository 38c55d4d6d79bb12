//! Device-backed audio output
//!
//! Production backend over rodio: one shared output stream kept alive on a
//! dedicated thread, one sink per channel, and volume ramps stepped by a
//! background task. Track sources are site paths (`/audio/...`) resolved
//! under an assets root on disk.
//!
//! Desktop runtimes have no autoplay policy, so the graph starts running,
//! play attempts never report [`PlayError::Blocked`], and the first-gesture
//! signal fires immediately.
//!
//! Gain ramps are scheduled with `tokio::spawn`; construct channels from
//! within a tokio runtime.

use crate::graph::{
    AudioBackend, AudioGraph, ChannelHandles, GainNode, GraphError, GraphState, MediaChannel,
    PlayError,
};
use rodio::source::Zero;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Volume update interval while a ramp is in flight
const RAMP_STEP: Duration = Duration::from_millis(15);

/// Backend playing through the default output device
pub struct RodioBackend {
    assets_root: PathBuf,
    _gesture_tx: watch::Sender<bool>,
    gesture_rx: watch::Receiver<bool>,
}

impl RodioBackend {
    /// Backend resolving track sources under `assets_root`
    pub fn new(assets_root: impl Into<PathBuf>) -> Self {
        let (gesture_tx, gesture_rx) = watch::channel(true);
        Self {
            assets_root: assets_root.into(),
            _gesture_tx: gesture_tx,
            gesture_rx,
        }
    }
}

impl AudioBackend for RodioBackend {
    fn open_graph(&self) -> Result<Arc<dyn AudioGraph>, GraphError> {
        let handle = open_stream_handle()?;
        Ok(Arc::new(RodioGraph {
            handle,
            assets_root: self.assets_root.clone(),
            epoch: Instant::now(),
        }))
    }

    fn first_gesture(&self) -> watch::Receiver<bool> {
        self.gesture_rx.clone()
    }
}

/// Open the default output device on a dedicated thread.
///
/// `OutputStream` is not `Send`, so the stream itself lives on (and dies
/// with) a parked thread; only the cloneable handle leaves it.
fn open_stream_handle() -> Result<OutputStreamHandle, GraphError> {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::Builder::new()
        .name("ambience-output".into())
        .spawn(move || match OutputStream::try_default() {
            Ok((stream, handle)) => {
                if tx.send(Ok(handle)).is_ok() {
                    let _keepalive = stream;
                    loop {
                        std::thread::park();
                    }
                }
            }
            Err(err) => {
                let _ = tx.send(Err(GraphError::Device(err.to_string())));
            }
        })
        .map_err(|err| GraphError::Device(err.to_string()))?;

    rx.recv()
        .map_err(|_| GraphError::Device("output thread exited".into()))?
}

struct RodioGraph {
    handle: OutputStreamHandle,
    assets_root: PathBuf,
    epoch: Instant,
}

impl AudioGraph for RodioGraph {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn state(&self) -> GraphState {
        GraphState::Running
    }

    fn resume(&self) -> Result<(), GraphError> {
        Ok(())
    }

    fn prime(&self) -> Result<(), GraphError> {
        let silence = Zero::<f32>::new(2, 44_100).take_duration(Duration::from_millis(5));
        self.handle
            .play_raw(silence)
            .map_err(|err| GraphError::Connection(err.to_string()))
    }

    fn create_channel(&self) -> Result<ChannelHandles, GraphError> {
        let sink = Sink::try_new(&self.handle)
            .map_err(|err| GraphError::Connection(err.to_string()))?;
        sink.pause();
        let sink = Arc::new(sink);

        Ok(ChannelHandles {
            media: Box::new(RodioChannel {
                sink: Arc::clone(&sink),
                assets_root: self.assets_root.clone(),
                source: None,
            }),
            gain: Some(Box::new(RodioGain {
                sink,
                generation: Arc::new(AtomicU64::new(0)),
            })),
        })
    }
}

struct RodioChannel {
    sink: Arc<Sink>,
    assets_root: PathBuf,
    source: Option<String>,
}

impl MediaChannel for RodioChannel {
    fn load(&mut self, source: &str, looping: bool) {
        self.source = Some(source.to_string());
        self.sink.stop();
        self.sink.pause();

        let path = resolve_source(&self.assets_root, source);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) => {
                warn!("could not open {}: {err}", path.display());
                return;
            }
        };
        match Decoder::new(BufReader::new(file)) {
            Ok(decoder) if looping => self.sink.append(decoder.repeat_infinite()),
            Ok(decoder) => self.sink.append(decoder),
            Err(err) => warn!("could not decode {}: {err}", path.display()),
        }
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn is_ready(&self) -> bool {
        // Local files are fully available once appended.
        true
    }

    fn try_play(&mut self) -> Result<(), PlayError> {
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_playing(&self) -> bool {
        !self.sink.is_paused() && !self.sink.empty()
    }

    fn position(&self) -> f64 {
        self.sink.get_pos().as_secs_f64()
    }

    fn seek(&mut self, seconds: f64) {
        if let Err(err) = self.sink.try_seek(Duration::from_secs_f64(seconds.max(0.0))) {
            debug!("seek failed: {err:?}");
        }
    }
}

struct RodioGain {
    sink: Arc<Sink>,
    /// Bumped on every set/ramp so a superseded ramp task stops stepping
    generation: Arc<AtomicU64>,
}

impl GainNode for RodioGain {
    fn value(&self) -> f32 {
        self.sink.volume()
    }

    fn set(&mut self, value: f32) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.sink.set_volume(value);
    }

    fn ramp_to(&mut self, target: f32, duration: Duration) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let guard = Arc::clone(&self.generation);
        let sink = Arc::clone(&self.sink);
        let from = sink.volume();

        tokio::spawn(async move {
            let steps = (duration.as_millis() / RAMP_STEP.as_millis()).max(1) as u32;
            for step in 1..=steps {
                tokio::time::sleep(RAMP_STEP).await;
                if guard.load(Ordering::Acquire) != generation {
                    return;
                }
                let progress = step as f32 / steps as f32;
                sink.set_volume(from + (target - from) * progress);
            }
        });
    }
}

/// Map a site source path (`/audio/foo.mp3`) onto the assets root
fn resolve_source(assets_root: &Path, source: &str) -> PathBuf {
    assets_root.join(source.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_paths_resolve_under_assets_root() {
        let root = PathBuf::from("/srv/nomad/assets");
        assert_eq!(
            resolve_source(&root, "/audio/site_ost.mp3"),
            PathBuf::from("/srv/nomad/assets/audio/site_ost.mp3")
        );
        assert_eq!(
            resolve_source(&root, "audio/devlogs.mp3"),
            PathBuf::from("/srv/nomad/assets/audio/devlogs.mp3")
        );
    }
}
