//! Run loop tests
//!
//! Feeds commands through the channel the UI would use and checks what the
//! loop leaves behind: controller state, sink events and the saved session.

use rena_controller::{Command, Controller, ControllerEvent, JsonPlaylistStorage, PlayerConfig};
use rena_core::{PlaylistStorage, SourceKind, Track, SAVE_PLAYLIST_STATE};
use rena_playback::{bus, MockPipeline, PlaybackState};
use std::fs;
use std::future;
use std::path::Path;
use tempfile::TempDir;
use tokio::sync::mpsc;

// ===== Test Helpers =====

/// Data directory plus three (fake) audio files inside it
fn library() -> (TempDir, Vec<Track>) {
    let dir = tempfile::tempdir().unwrap();
    let music = dir.path().join("music");
    fs::create_dir_all(&music).unwrap();

    let tracks = ["one", "two", "three"]
        .iter()
        .map(|name| {
            let path = music.join(format!("{name}.ogg"));
            fs::write(&path, b"OggS").unwrap();
            Track::from_local_path(&path).unwrap()
        })
        .collect();
    (dir, tracks)
}

fn config(data_dir: &Path) -> PlayerConfig {
    let mut config = PlayerConfig::default();
    config.storage.data_dir = data_dir.join("state");
    config
}

fn build(config: &PlayerConfig) -> Controller<MockPipeline> {
    let (sender, receiver) = bus();
    let mut pipeline = MockPipeline::new(sender);
    pipeline.auto_confirm = true;

    let storage = JsonPlaylistStorage::open(&config.storage.data_dir).unwrap();
    Controller::from_config(pipeline, receiver, config, storage).unwrap()
}

async fn run_commands(controller: &mut Controller<MockPipeline>, commands: Vec<Command>) {
    let (tx, rx) = mpsc::channel(16);
    for command in commands {
        tx.send(command).await.unwrap();
    }
    drop(tx);

    controller.run(rx, future::pending()).await.unwrap();
}

// ===== Tests =====

#[tokio::test]
async fn test_commands_drive_playback_and_events_reach_the_sink() {
    let (dir, tracks) = library();
    let config = config(dir.path());
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut controller = build(&config).with_event_sink(events_tx);

    run_commands(
        &mut controller,
        vec![Command::Append(tracks), Command::PlayPause, Command::Next],
    )
    .await;

    let second = controller.sequencer().handle_at(1);
    assert_eq!(controller.playing(), second);
    assert_eq!(controller.state(), PlaybackState::Playing);

    let mut events = Vec::new();
    while let Ok(event) = events_rx.try_recv() {
        events.push(event);
    }
    assert!(events.contains(&ControllerEvent::TrackChanged(second)));
    assert!(events.contains(&ControllerEvent::StateChanged(PlaybackState::Playing)));
    assert!(controller.drain_events().is_empty());
}

#[tokio::test]
async fn test_session_is_saved_on_exit_and_restored_on_start() {
    let (dir, tracks) = library();
    let config = config(dir.path());

    let mut first = build(&config);
    run_commands(
        &mut first,
        vec![
            Command::Append(tracks.clone()),
            Command::PlayPause,
            Command::Next,
            Command::Next,
        ],
    )
    .await;

    let storage = JsonPlaylistStorage::open(&config.storage.data_dir).unwrap();
    assert_eq!(storage.load_playlist(SAVE_PLAYLIST_STATE).unwrap().len(), 3);
    assert_eq!(storage.load_current_token().unwrap().as_deref(), Some("2"));

    let second = build(&config);
    assert_eq!(second.sequencer().len(), 3);
    assert_eq!(second.state(), PlaybackState::Stopped);
    let selected = second.sequencer().selection().to_vec();
    assert_eq!(selected.len(), 1);
    assert_eq!(second.sequencer().track(selected[0]), Some(&tracks[2]));
}

#[tokio::test]
async fn test_remote_rows_survive_a_restart() {
    let (dir, tracks) = library();
    let config = config(dir.path());
    let stream = Track::builder("http://radio.example.com:8000/live", SourceKind::Http)
        .title("Night Radio")
        .build()
        .unwrap();
    let remote = Track::builder("dbx:id:42", SourceKind::Provider(2))
        .provider("dropbox")
        .title("Remote Song")
        .length(312)
        .build()
        .unwrap();
    let rows = vec![stream, remote, tracks[0].clone()];

    let mut first = build(&config);
    run_commands(&mut first, vec![Command::Append(rows.clone())]).await;

    let second = build(&config);
    let restored: Vec<Track> = second
        .sequencer()
        .iter()
        .map(|(_, entry)| entry.track().clone())
        .collect();
    assert_eq!(restored, rows);
}

#[tokio::test]
async fn test_restore_can_be_disabled() {
    let (dir, tracks) = library();
    let mut config = config(dir.path());

    let mut first = build(&config);
    run_commands(&mut first, vec![Command::Append(tracks)]).await;

    config.playlist.restore_on_start = false;
    let second = build(&config);
    assert!(second.sequencer().is_empty());
}

#[tokio::test]
async fn test_shutdown_signal_ends_the_loop() {
    let (dir, tracks) = library();
    let config = config(dir.path());
    let mut controller = build(&config);
    controller.append(tracks);

    let (_tx, rx) = mpsc::channel::<Command>(1);
    controller.run(rx, async {}).await.unwrap();

    let storage = JsonPlaylistStorage::open(&config.storage.data_dir).unwrap();
    assert_eq!(storage.load_playlist(SAVE_PLAYLIST_STATE).unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_command_does_not_stop_the_loop() {
    let (dir, tracks) = library();
    let config = config(dir.path());
    let mut controller = build(&config);

    // Nothing plays yet, so seeking fails
    run_commands(
        &mut controller,
        vec![
            Command::SeekFraction(0.5),
            Command::Append(tracks),
            Command::PlayPause,
        ],
    )
    .await;

    assert_eq!(controller.state(), PlaybackState::Playing);
}

#[test]
fn test_invalid_config_is_rejected() {
    let (dir, _) = library();
    let mut config = config(dir.path());
    config.playback.volume = 2.0;

    let (sender, receiver) = bus();
    let storage = JsonPlaylistStorage::open(&config.storage.data_dir).unwrap();
    let result = Controller::from_config(MockPipeline::new(sender), receiver, &config, storage);

    assert!(result.is_err());
}
