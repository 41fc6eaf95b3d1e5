//! Controller tests
//!
//! Drives a controller over a scripted pipeline: end of stream, errors, stream
//! tags and provider round-trips are posted on the bus exactly as a media
//! framework would, then one `pump()` lets the controller react.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rena_controller::{Controller, ControllerError, ControllerEvent};
use rena_core::{
    Favorites, NoProgress, PlaylistStorage, Progress, ProviderHooks, RenaError, TagEditor,
    TagMask, TagValues, Track,
};
use rena_playback::{bus, Engine, EngineConfig, MockPipeline, PipelineErrorKind, PlaybackState};
use rena_playlist::{Handle, RowState, Sequencer, SequencerConfig};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Once;

// ===== Test Helpers =====

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

#[derive(Default)]
struct MemoryStorage {
    playlists: HashMap<String, Vec<Track>>,
    token: Option<String>,
}

impl PlaylistStorage for MemoryStorage {
    fn save_playlist(&mut self, name: &str, rows: &[Track]) -> rena_core::Result<()> {
        self.playlists.insert(name.to_string(), rows.to_vec());
        Ok(())
    }

    fn load_playlist(&self, name: &str) -> rena_core::Result<Vec<Track>> {
        Ok(self.playlists.get(name).cloned().unwrap_or_default())
    }

    fn lookup_track(&self, file: &str) -> rena_core::Result<Option<Track>> {
        if !file.starts_with('/') {
            return Ok(None);
        }
        Ok(Track::from_local_path(file).ok())
    }

    fn save_current_token(&mut self, token: Option<&str>) -> rena_core::Result<()> {
        self.token = token.map(str::to_string);
        Ok(())
    }

    fn load_current_token(&self) -> rena_core::Result<Option<String>> {
        Ok(self.token.clone())
    }
}

/// Provider answering with a CDN URL and logging every hook call
#[derive(Clone, Default)]
struct FakeProvider {
    calls: Rc<RefCell<Vec<String>>>,
}

impl ProviderHooks for FakeProvider {
    fn prepare_source(&mut self, track: &Track) -> rena_core::Result<String> {
        self.calls.borrow_mut().push(format!("prepare {}", track.file()));
        Ok(format!("https://cdn.example.com/{}", track.file()))
    }

    fn clean_source(&mut self) {
        self.calls.borrow_mut().push("clean".to_string());
    }
}

#[derive(Clone, Default)]
struct FakeTagEditor {
    written: Rc<RefCell<Vec<String>>>,
}

impl TagEditor for FakeTagEditor {
    fn apply(
        &mut self,
        files: &[String],
        _mask: TagMask,
        _values: &TagValues,
        progress: &mut dyn Progress,
    ) -> rena_core::Result<usize> {
        for (done, file) in files.iter().enumerate() {
            self.written.borrow_mut().push(file.clone());
            if progress.report(done + 1, files.len()).is_break() {
                return Err(RenaError::Cancelled);
            }
        }
        Ok(files.len())
    }
}

#[derive(Default)]
struct FakeFavorites {
    marked: HashSet<String>,
}

impl Favorites for FakeFavorites {
    fn is_favorite(&self, file: &str) -> bool {
        self.marked.contains(file)
    }

    fn toggle(&mut self, track: &Track) -> rena_core::Result<bool> {
        let file = track.file().to_string();
        if self.marked.remove(&file) {
            Ok(false)
        } else {
            self.marked.insert(file);
            Ok(true)
        }
    }
}

fn local(name: &str) -> Track {
    Track::from_local_path(format!("/music/{name}.flac")).unwrap()
}

/// Controller over an auto-confirming pipeline with one row per track
fn controller_with(tracks: Vec<Track>) -> (Controller<MockPipeline>, Vec<Handle>) {
    init_tracing();
    let (sender, receiver) = bus();
    let mut pipeline = MockPipeline::new(sender);
    pipeline.auto_confirm = true;

    let engine = Engine::new(pipeline, receiver, EngineConfig::default());
    let sequencer = Sequencer::with_rng(SequencerConfig::default(), StdRng::seed_from_u64(7));
    let mut controller = Controller::new(engine, sequencer, MemoryStorage::default());
    let rows = controller.append(tracks);
    (controller, rows)
}

fn controller(names: &[&str]) -> (Controller<MockPipeline>, Vec<Handle>) {
    controller_with(names.iter().map(|n| local(n)).collect())
}

fn errors(events: &[ControllerEvent]) -> Vec<(Option<Handle>, String, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            ControllerEvent::Error {
                row,
                message,
                missing,
            } => Some((*row, message.clone(), *missing)),
            _ => None,
        })
        .collect()
}

// ===== Transport =====

#[test]
fn test_play_from_stopped_starts_first_row() {
    let (mut c, rows) = controller(&["a", "b", "c"]);

    c.play_pause_resume();

    assert_eq!(c.state(), PlaybackState::Playing);
    assert_eq!(c.playing(), Some(rows[0]));
    assert_eq!(c.sequencer().row_state(rows[0]), Some(RowState::Playing));

    let events = c.drain_events();
    assert!(events.contains(&ControllerEvent::TrackChanged(Some(rows[0]))));
    assert!(events.contains(&ControllerEvent::StateChanged(PlaybackState::Playing)));
}

#[test]
fn test_pause_and_resume_update_row_icon() {
    let (mut c, rows) = controller(&["a", "b"]);
    c.play_pause_resume();

    c.play_pause_resume();
    assert_eq!(c.state(), PlaybackState::Paused);
    assert_eq!(c.sequencer().row_state(rows[0]), Some(RowState::Paused));

    c.play_pause_resume();
    assert_eq!(c.state(), PlaybackState::Playing);
    assert_eq!(c.sequencer().row_state(rows[0]), Some(RowState::Playing));
}

#[test]
fn test_end_of_stream_advances_to_next_row() {
    let (mut c, rows) = controller(&["a", "b", "c"]);
    c.play_pause_resume();

    c.engine().pipeline().post_eos();
    c.pump();

    assert_eq!(c.playing(), Some(rows[1]));
    assert_eq!(c.state(), PlaybackState::Playing);
    assert_eq!(c.sequencer().row_state(rows[0]), Some(RowState::None));
    assert_eq!(c.sequencer().row_state(rows[1]), Some(RowState::Playing));
    assert_eq!(c.engine().track().unwrap().title, "b");
}

#[test]
fn test_end_of_playlist_stops_and_reports() {
    let (mut c, rows) = controller(&["a", "b"]);
    c.play_pause_resume();
    c.next();
    assert_eq!(c.playing(), Some(rows[1]));
    c.drain_events();

    c.engine().pipeline().post_eos();
    c.pump();

    let events = c.drain_events();
    assert!(events.contains(&ControllerEvent::PlaylistEnded));
    assert!(events.contains(&ControllerEvent::TrackChanged(None)));
    assert_eq!(c.state(), PlaybackState::Stopped);
    assert_eq!(c.playing(), None);
    assert_eq!(c.sequencer().current(), None);
}

#[test]
fn test_stop_resets_navigation() {
    let (mut c, rows) = controller(&["a", "b", "c"]);
    c.play_pause_resume();
    c.next();

    c.stop();

    assert_eq!(c.state(), PlaybackState::Stopped);
    assert_eq!(c.playing(), None);
    assert_eq!(c.sequencer().current(), None);
    assert_eq!(c.sequencer().unplayed_count(), 3);
    assert_eq!(c.sequencer().row_state(rows[1]), Some(RowState::None));

    c.play_pause_resume();
    assert_eq!(c.playing(), Some(rows[0]));
}

#[test]
fn test_second_stop_emits_nothing() {
    let (mut c, _) = controller(&["a"]);
    c.play_pause_resume();
    c.stop();
    c.drain_events();

    c.stop();

    assert!(c.drain_events().is_empty());
}

#[test]
fn test_next_and_prev_ignored_while_stopped() {
    let (mut c, _) = controller(&["a", "b"]);

    c.next();
    c.prev();

    assert_eq!(c.playing(), None);
    assert!(c.drain_events().is_empty());
}

#[test]
fn test_prev_walks_back_and_stays_at_start() {
    let (mut c, rows) = controller(&["a", "b", "c"]);
    c.play_pause_resume();
    c.next();
    c.next();

    c.prev();
    assert_eq!(c.playing(), Some(rows[1]));
    c.prev();
    assert_eq!(c.playing(), Some(rows[0]));
    c.prev();
    assert_eq!(c.playing(), Some(rows[0]));
    assert_eq!(c.state(), PlaybackState::Playing);
}

#[test]
fn test_play_handle_jumps_and_continues_from_there() {
    let (mut c, rows) = controller(&["a", "b", "c", "d"]);

    c.play_handle(rows[2]).unwrap();
    assert_eq!(c.playing(), Some(rows[2]));

    c.next();
    assert_eq!(c.playing(), Some(rows[3]));
}

#[test]
fn test_play_removed_handle_is_an_error() {
    let (mut c, rows) = controller(&["a", "b"]);
    c.select(&[rows[0]]);
    c.remove_selection();

    let err = c.play_handle(rows[0]).unwrap_err();
    assert!(matches!(err, ControllerError::Playlist(_)));
}

#[test]
fn test_volume_delta_clamps() {
    let (mut c, _) = controller(&["a"]);

    assert!((c.volume_delta(0.2) - 0.7).abs() < 1e-9);
    assert!((c.volume_delta(5.0) - 1.0).abs() < f64::EPSILON);
    assert!(c.volume_delta(-5.0).abs() < f64::EPSILON);
    assert!(c.engine().volume().abs() < f64::EPSILON);
}

// ===== Errors =====

#[test]
fn test_error_stops_and_marks_row() {
    let (mut c, rows) = controller(&["a", "b"]);
    c.play_pause_resume();
    c.drain_events();

    c.engine()
        .pipeline()
        .post_error(PipelineErrorKind::Decode, "Could not decode stream");
    c.pump();

    let events = c.drain_events();
    assert_eq!(
        errors(&events),
        vec![(Some(rows[0]), "Could not decode stream".to_string(), false)]
    );
    assert_eq!(c.state(), PlaybackState::Stopped);
    assert_eq!(c.playing(), None);
    assert_eq!(c.sequencer().row_state(rows[0]), Some(RowState::Error));
}

#[test]
fn test_missing_resource_marks_row_missing() {
    let (mut c, rows) = controller(&["a"]);
    c.play_pause_resume();

    c.engine()
        .pipeline()
        .post_error(PipelineErrorKind::ResourceNotFound, "No such file");
    c.pump();

    let events = c.drain_events();
    assert!(errors(&events)[0].2);
    assert_eq!(c.sequencer().row_state(rows[0]), Some(RowState::Missing));
}

#[test]
fn test_ignore_errors_skips_to_next_row() {
    let (c, rows) = controller(&["a", "b", "c"]);
    let mut c = c.with_ignore_errors(true);
    c.play_pause_resume();

    c.engine()
        .pipeline()
        .post_error(PipelineErrorKind::Network, "Connection reset");
    c.pump();

    assert_eq!(c.playing(), Some(rows[1]));
    assert_eq!(c.state(), PlaybackState::Playing);
    assert_eq!(c.sequencer().row_state(rows[0]), Some(RowState::Error));
    assert_eq!(c.sequencer().row_state(rows[1]), Some(RowState::Playing));
}

#[test]
fn test_repeated_errors_reported_once_then_stop() {
    let (c, rows) = controller(&["a", "b", "c"]);
    let mut c = c.with_ignore_errors(true);
    c.play_pause_resume();
    c.engine_mut().pipeline_mut().auto_confirm = false;
    c.drain_events();

    for expected in [Some(rows[1]), Some(rows[2]), None] {
        c.engine()
            .pipeline()
            .post_error(PipelineErrorKind::Decode, "Unsupported codec");
        c.pump();
        assert_eq!(c.playing(), expected);
    }

    let events = c.drain_events();
    assert_eq!(errors(&events).len(), 1);
    assert_eq!(c.state(), PlaybackState::Stopped);
    for row in rows {
        assert_eq!(c.sequencer().row_state(row), Some(RowState::Error));
    }
}

#[test]
fn test_follow_up_stream_error_is_not_reported() {
    let (mut c, _) = controller(&["a", "b"]);
    c.play_pause_resume();
    c.engine_mut().pipeline_mut().auto_confirm = false;

    let pipeline = c.engine().pipeline();
    pipeline.post_error(PipelineErrorKind::Decode, "Corrupt frame");
    pipeline.post_error(PipelineErrorKind::StreamFailed, "Internal data stream error");
    c.pump();

    assert_eq!(errors(&c.drain_events()).len(), 1);
}

// ===== Collaborators =====

#[test]
fn test_provider_track_is_prepared_and_cleaned() {
    let provider = FakeProvider::default();
    let calls = provider.calls.clone();
    let (c, rows) = controller_with(vec![Track::from_provider("track/42", 3, "cloud").unwrap()]);
    let mut c = c.with_provider(provider);

    c.play_pause_resume();

    assert_eq!(c.playing(), Some(rows[0]));
    assert_eq!(c.state(), PlaybackState::Playing);
    assert_eq!(
        c.engine().pipeline().uri.as_deref(),
        Some("https://cdn.example.com/track/42")
    );

    c.stop();
    assert_eq!(
        *calls.borrow(),
        vec!["prepare track/42".to_string(), "clean".to_string()]
    );
}

#[test]
fn test_local_tracks_do_not_touch_the_provider() {
    let provider = FakeProvider::default();
    let calls = provider.calls.clone();
    let (c, _) = controller(&["a"]);
    let mut c = c.with_provider(provider);

    c.play_pause_resume();
    c.stop();

    assert!(calls.borrow().is_empty());
}

#[test]
fn test_provider_track_without_provider_fails() {
    let (mut c, rows) =
        controller_with(vec![Track::from_provider("track/42", 3, "cloud").unwrap()]);

    c.play_pause_resume();

    let events = c.drain_events();
    let errors = errors(&events);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].1.contains("track/42"));
    assert_eq!(c.sequencer().row_state(rows[0]), Some(RowState::Error));
    assert_eq!(c.playing(), None);
}

#[test]
fn test_stream_tags_reach_the_playlist_row() {
    let (mut c, rows) =
        controller_with(vec![Track::from_url("http://radio.example.com/live").unwrap()]);
    c.play_pause_resume();
    c.drain_events();

    c.engine()
        .pipeline()
        .post_tags(Some("Night Drive"), Some("Synth Band"));
    c.pump();

    assert!(c
        .drain_events()
        .contains(&ControllerEvent::TagsChanged(rows[0])));
    let track = c.sequencer().track(rows[0]).unwrap();
    assert_eq!(track.title, "Night Drive");
    assert_eq!(track.artist, "Synth Band");
}

#[test]
fn test_edit_tags_updates_rows_and_held_track() {
    let editor = FakeTagEditor::default();
    let written = editor.written.clone();
    let (c, rows) = controller(&["a", "b"]);
    let mut c = c.with_tag_editor(editor);
    c.play_pause_resume();
    c.drain_events();

    let values = TagValues {
        title: "Renamed".to_string(),
        ..TagValues::default()
    };
    let count = c
        .edit_tags(&[rows[0]], TagMask::TITLE, &values, &mut NoProgress)
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(*written.borrow(), vec!["/music/a.flac".to_string()]);
    assert_eq!(c.sequencer().track(rows[0]).unwrap().title, "Renamed");
    assert_eq!(c.sequencer().track(rows[1]).unwrap().title, "b");
    assert_eq!(c.engine().track().unwrap().title, "Renamed");
    assert_eq!(
        c.drain_events(),
        vec![ControllerEvent::TagsChanged(rows[0])]
    );
}

#[test]
fn test_edit_tags_needs_an_editor() {
    let (mut c, rows) = controller(&["a"]);
    let values = TagValues::default();

    let err = c
        .edit_tags(&rows, TagMask::TITLE, &values, &mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, ControllerError::MissingCollaborator(_)));
}

#[test]
fn test_toggle_favorite_of_playing_track() {
    let (c, _) = controller(&["a"]);
    let mut c = c.with_favorites(FakeFavorites::default());

    assert!(matches!(
        c.toggle_favorite(),
        Err(ControllerError::NothingPlaying)
    ));

    c.play_pause_resume();
    c.drain_events();

    assert!(c.toggle_favorite().unwrap());
    assert!(c.is_current_favorite());
    assert_eq!(
        c.drain_events(),
        vec![ControllerEvent::FavoriteChanged {
            file: "/music/a.flac".to_string(),
            favorite: true,
        }]
    );

    assert!(!c.toggle_favorite().unwrap());
    assert!(!c.is_current_favorite());
}

// ===== Playlist Editing =====

#[test]
fn test_toggles_report_new_mode() {
    let (mut c, _) = controller(&["a"]);

    assert!(c.toggle_shuffle());
    assert!(c.toggle_repeat());
    assert!(!c.toggle_shuffle());

    assert_eq!(
        c.drain_events(),
        vec![
            ControllerEvent::ShuffleChanged(true),
            ControllerEvent::RepeatChanged(true),
            ControllerEvent::ShuffleChanged(false),
        ]
    );
}

#[test]
fn test_queued_selection_plays_next() {
    let (mut c, rows) = controller(&["a", "b", "c", "d"]);
    c.play_pause_resume();

    c.select(&[rows[3]]);
    c.toggle_queue_selection();
    assert_eq!(c.sequencer().queue_label(rows[3]), Some(1));

    c.next();
    assert_eq!(c.playing(), Some(rows[3]));
    assert!(c.sequencer().queue().is_empty());
}

#[test]
fn test_removing_the_playing_row_keeps_playback() {
    let (mut c, rows) = controller(&["a", "b", "c"]);
    c.play_pause_resume();

    c.select(&[rows[0]]);
    let removed = c.remove_selection();

    assert_eq!(removed.len(), 1);
    assert_eq!(c.playing(), None);
    assert_eq!(c.state(), PlaybackState::Playing);

    c.engine().pipeline().post_eos();
    c.pump();
    assert_eq!(c.playing(), Some(rows[1]));
}

#[test]
fn test_crop_and_clear() {
    let (mut c, rows) = controller(&["a", "b", "c"]);
    c.select(&[rows[1]]);

    assert_eq!(c.crop_selection().len(), 2);
    assert_eq!(c.sequencer().len(), 1);

    c.play_pause_resume();
    c.clear();

    assert!(c.sequencer().is_empty());
    assert_eq!(c.state(), PlaybackState::Stopped);
    assert_eq!(c.playing(), None);
}

#[test]
fn test_save_and_restore_through_storage() {
    let (mut c, rows) = controller(&["a", "b", "c"]);
    c.play_handle(rows[1]).unwrap();
    c.save_playlist().unwrap();

    let outcome = c.restore_playlist(&mut NoProgress).unwrap();

    assert_eq!(outcome.restored, 3);
    assert_eq!(c.playing(), None);
    assert_eq!(c.state(), PlaybackState::Stopped);
    let current = outcome.current.unwrap();
    assert_eq!(c.sequencer().position_of(current), Some(1));

    c.play_pause_resume();
    assert_eq!(c.engine().track().unwrap().title, "b");
}
