//! Mute toggle and persistence tests

use nomad_ambience::graph::AudioBackend;
use nomad_ambience::{
    AmbienceConfig, AudioManager, SettingsStore, SimBackend, TrackRegistry,
};
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

async fn manager_with(backend: &Arc<SimBackend>, store: SettingsStore) -> AudioManager {
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
async fn mute_pauses_and_unmute_resumes_without_rewinding() {
    let backend = Arc::new(SimBackend::new());
    backend.user_gesture();
    let store = SettingsStore::in_memory().await.unwrap();
    let manager = manager_with(&backend, store).await;
    manager.initialize().await.unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;
    let position_at_mute = backend.channels()[0].position;
    assert!(position_at_mute > 0.0);

    manager.toggle_mute().await.unwrap();
    assert!(manager.is_muted());
    for channel in backend.channels() {
        assert!(!channel.playing);
        assert!(channel.gain < 0.01);
    }

    // Position must not drift backwards while muted.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let frozen = backend.channels()[0].position;
    assert!(frozen >= position_at_mute);

    manager.toggle_mute().await.unwrap();
    assert!(!manager.is_muted());
    tokio::time::sleep(Duration::from_millis(60)).await;

    let resumed = &backend.channels()[0];
    assert!(resumed.playing);
    assert!(
        resumed.position >= frozen,
        "track rewound across mute: {resumed:?}"
    );
    assert!((resumed.gain - 0.5).abs() < 0.05);
}

#[tokio::test]
async fn mute_preference_survives_reload() {
    let backend = Arc::new(SimBackend::new());
    let store = SettingsStore::in_memory().await.unwrap();

    let manager = manager_with(&backend, store.clone()).await;
    assert!(!manager.is_muted());
    manager.toggle_mute().await.unwrap();
    assert!(manager.is_muted());
    drop(manager);

    // A fresh manager over the same store restores the preference.
    let reloaded = manager_with(&backend, store).await;
    assert!(reloaded.is_muted());
}

#[tokio::test]
async fn muting_mid_crossfade_silences_both_channels() {
    let backend = Arc::new(SimBackend::new());
    backend.user_gesture();
    let store = SettingsStore::in_memory().await.unwrap();
    let manager = manager_with(&backend, store).await;
    manager.initialize().await.unwrap();

    // Kick off a crossfade and mute while both channels are audible.
    let racing = manager.clone();
    let crossfade = tokio::spawn(async move { racing.set_context("/systems").await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.toggle_mute().await.unwrap();
    crossfade.await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(manager.is_muted());
    for channel in backend.channels() {
        assert!(!channel.playing, "channel still playing: {channel:?}");
        assert!(channel.gain < 0.01, "channel still audible: {channel:?}");
    }
}

#[tokio::test]
async fn context_switch_while_muted_stays_silent() {
    let backend = Arc::new(SimBackend::new());
    backend.user_gesture();
    let store = SettingsStore::in_memory().await.unwrap();
    let manager = manager_with(&backend, store).await;
    manager.initialize().await.unwrap();

    manager.toggle_mute().await.unwrap();
    manager.set_context("/gallery").await.unwrap();

    assert_eq!(manager.current_track_id(), "gallery");
    // Muted silent switch stages the track without flagging a block.
    assert!(!manager.is_autoplay_blocked());
    for channel in backend.channels() {
        assert!(!channel.playing);
        assert!(channel.gain < 0.01);
    }

    // Unmuting brings the staged track up.
    manager.toggle_mute().await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let channels = backend.channels();
    let active = channels
        .iter()
        .find(|c| c.playing)
        .expect("a channel resumed after unmute");
    assert_eq!(active.source.as_deref(), Some("/audio/gallery.mp3"));
    assert!((active.gain - 0.5).abs() < 0.05);
}
