//! Autoplay policy, recovery, and degraded-operation tests

use nomad_ambience::graph::AudioBackend;
use nomad_ambience::{
    AmbienceConfig, AudioManager, SettingsStore, SimBackend, TrackRegistry,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> AmbienceConfig {
    AmbienceConfig {
        fade: Duration::from_millis(160),
        mute_ramp: Duration::from_millis(20),
        ready_timeout: Duration::from_millis(150),
        ready_poll: Duration::from_millis(5),
        clock_poll: Duration::from_millis(2),
    }
}

async fn manager_with(backend: &Arc<SimBackend>) -> AudioManager {
    let store = SettingsStore::in_memory().await.unwrap();
    AudioManager::new(
        TrackRegistry::site_default(),
        fast_config(),
        Arc::clone(backend) as Arc<dyn AudioBackend>,
        store,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn initialize_without_gesture_flags_autoplay_block() {
    let backend = Arc::new(SimBackend::new());
    let manager = manager_with(&backend).await;

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    let subscription = manager.subscribe(Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(!manager.is_muted());
    manager.initialize().await.unwrap();

    assert!(manager.is_autoplay_blocked());
    assert!(!manager.is_muted());
    assert!(notified.load(Ordering::SeqCst) >= 1);
    assert!(backend.channels().iter().all(|c| !c.playing));

    subscription.unsubscribe();
}

#[tokio::test]
async fn context_switch_before_gesture_is_a_silent_switch() {
    let backend = Arc::new(SimBackend::new());
    let manager = manager_with(&backend).await;
    manager.initialize().await.unwrap();

    let attempts_before: u32 = backend.channels().iter().map(|c| c.attempts).sum();
    manager.set_context("/devlogs").await.unwrap();

    // The track switched logically but the silent switch itself must not
    // issue any play call.
    assert_eq!(manager.current_track_id(), "devlogs");
    assert!(manager.is_autoplay_blocked());
    let attempts_after: u32 = backend.channels().iter().map(|c| c.attempts).sum();
    assert_eq!(attempts_after, attempts_before);
    for channel in backend.channels() {
        assert!(!channel.playing);
        assert!(channel.gain < 0.01);
    }
}

#[tokio::test]
async fn gesture_recovery_starts_the_current_track() {
    let backend = Arc::new(SimBackend::new());
    let manager = manager_with(&backend).await;
    manager.initialize().await.unwrap();
    manager.set_context("/devlogs").await.unwrap();
    assert!(manager.is_autoplay_blocked());

    backend.user_gesture();
    manager.try_autoplay().await.unwrap();
    // Give the one-shot gesture listener a chance to settle too.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!manager.is_autoplay_blocked());
    let channels = backend.channels();
    let active = channels
        .iter()
        .find(|c| c.playing)
        .expect("current track started after gesture");
    assert_eq!(active.source.as_deref(), Some("/audio/devlogs.mp3"));
    assert!((active.gain - 0.5).abs() < 0.05);
}

#[tokio::test]
async fn first_gesture_alone_starts_playback() {
    let backend = Arc::new(SimBackend::new());
    let manager = manager_with(&backend).await;
    manager.initialize().await.unwrap();
    assert!(manager.is_autoplay_blocked());

    backend.user_gesture();

    // The one-shot document listener drives recovery without any API call.
    let mut recovered = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if !manager.is_autoplay_blocked() {
            recovered = true;
            break;
        }
    }
    assert!(recovered, "gesture listener never started playback");
    assert!(backend.channels().iter().any(|c| c.playing));
}

#[tokio::test]
async fn unknown_track_id_is_rejected_without_state_change() {
    let backend = Arc::new(SimBackend::new());
    backend.user_gesture();
    let manager = manager_with(&backend).await;
    manager.initialize().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let loads_before = backend.total_loads();
    let before = backend.channels();

    manager.set_track_by_id("not-a-real-id").await.unwrap();

    assert_eq!(manager.current_track_id(), "default");
    assert_eq!(backend.total_loads(), loads_before);
    let after = backend.channels();
    for (a, b) in before.iter().zip(after.iter()) {
        assert_eq!(a.source, b.source);
        assert_eq!(a.playing, b.playing);
    }
}

#[tokio::test]
async fn explicit_track_override_crossfades() {
    let backend = Arc::new(SimBackend::new());
    backend.user_gesture();
    let manager = manager_with(&backend).await;
    manager.initialize().await.unwrap();

    // A systems page with a bespoke soundtrack names the archives track.
    manager.set_track_by_id("archives").await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(manager.current_track_id(), "archives");
    let channels = backend.channels();
    let active = channels.iter().find(|c| c.playing).expect("track playing");
    assert_eq!(active.source.as_deref(), Some("/audio/archives.mp3"));
}

#[tokio::test]
async fn graph_failure_degrades_to_silent_operation() {
    let backend = Arc::new(SimBackend::new());
    backend.refuse_graph();
    let manager = manager_with(&backend).await;

    manager.initialize().await.unwrap();
    manager.set_context("/lore").await.unwrap();
    assert_eq!(manager.current_track_id(), "archives");

    manager.toggle_mute().await.unwrap();
    assert!(manager.is_muted());
    manager.try_autoplay().await.unwrap();

    // No channels were ever created, and nothing panicked along the way.
    assert!(backend.channels().is_empty());
}

#[tokio::test]
async fn reset_returns_to_the_default_track() {
    let backend = Arc::new(SimBackend::new());
    backend.user_gesture();
    let manager = manager_with(&backend).await;
    manager.initialize().await.unwrap();

    manager.set_context("/gallery").await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(manager.current_track_id(), "gallery");

    manager.reset_to_default().await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(manager.current_track_id(), "default");
}
