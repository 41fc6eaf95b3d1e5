//! Playback controller
//!
//! Glues one [`Engine`] to one [`Sequencer`] the way a player window does:
//! - Engine events drive row icons, auto-advance and error reporting
//! - Provider tracks are resolved through [`ProviderHooks`] before they play
//! - Tag edits reach both the playlist rows and the engine's held copy
//!
//! Everything runs on one thread. [`Controller::run`] multiplexes commands,
//! the one second timer and a shutdown signal with `tokio::select!`.

use crate::config::PlayerConfig;
use crate::error::{ControllerError, Result};
use crate::events::{Command, ControllerEvent};
use rena_core::{
    Favorites, NoProgress, PlaylistStorage, Progress, ProviderHooks, TagEditor, TagMask,
    TagValues, Track,
};
use rena_playback::{BusReceiver, Engine, EngineEvent, Pipeline, PlaybackState, TargetState};
use rena_playlist::{Handle, PlaylistError, RestoreOutcome, RowState, Sequencer};
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Position / buffering timer period
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How often the run loop drains the pipeline bus between ticks
const BUS_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Work left over after handling a batch of engine events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FollowUp {
    Advance,
    Stop,
}

/// Owns the engine, the sequencer and the injected collaborators
pub struct Controller<P: Pipeline> {
    engine: Engine<P>,
    sequencer: Sequencer,

    storage: Box<dyn PlaylistStorage>,
    provider: Option<Box<dyn ProviderHooks>>,
    tag_editor: Option<Box<dyn TagEditor>>,
    favorites: Option<Box<dyn Favorites>>,

    ignore_errors: bool,

    /// Row handed to the engine last
    playing: Option<Handle>,
    /// A provider session is open for the held track
    provider_session: bool,
    /// Last reported error message, to drop repeats
    last_error: Option<String>,
    /// Failures since a track last reached PLAYING
    failed_in_a_row: usize,
    follow_up: Option<FollowUp>,

    pending_events: VecDeque<ControllerEvent>,
    sink: Option<mpsc::UnboundedSender<ControllerEvent>>,
}

impl<P: Pipeline> Controller<P> {
    /// Create a controller around an engine and a sequencer
    pub fn new(
        engine: Engine<P>,
        sequencer: Sequencer,
        storage: impl PlaylistStorage + 'static,
    ) -> Self {
        Self {
            engine,
            sequencer,
            storage: Box::new(storage),
            provider: None,
            tag_editor: None,
            favorites: None,
            ignore_errors: false,
            playing: None,
            provider_session: false,
            last_error: None,
            failed_in_a_row: 0,
            follow_up: None,
            pending_events: VecDeque::new(),
            sink: None,
        }
    }

    /// Build engine and sequencer from `config`, restoring the last session
    /// when `playlist.restore_on_start` is set
    pub fn from_config(
        pipeline: P,
        bus: BusReceiver,
        config: &PlayerConfig,
        storage: impl PlaylistStorage + 'static,
    ) -> Result<Self> {
        config.validate()?;

        let engine = Engine::new(pipeline, bus, config.engine_config()?);
        let sequencer = Sequencer::new(config.sequencer_config());
        let mut controller =
            Self::new(engine, sequencer, storage).with_ignore_errors(config.playback.ignore_errors);

        if config.playlist.restore_on_start {
            let outcome = controller.restore_playlist(&mut NoProgress)?;
            info!(
                restored = outcome.restored,
                skipped = outcome.skipped,
                "Restored previous session"
            );
        }

        Ok(controller)
    }

    /// Attach the remote provider collaborator
    pub fn with_provider(mut self, provider: impl ProviderHooks + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Attach the tag writer collaborator
    pub fn with_tag_editor(mut self, editor: impl TagEditor + 'static) -> Self {
        self.tag_editor = Some(Box::new(editor));
        self
    }

    /// Attach the favorites collaborator
    pub fn with_favorites(mut self, favorites: impl Favorites + 'static) -> Self {
        self.favorites = Some(Box::new(favorites));
        self
    }

    /// Skip failing tracks instead of stopping
    pub fn with_ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    /// Forward events to `sink` from the run loop instead of queueing them
    pub fn with_event_sink(mut self, sink: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        self.sink = Some(sink);
        self
    }

    // ===== Transport =====

    /// Play when stopped, pause when playing, resume when paused
    pub fn play_pause_resume(&mut self) {
        match self.engine.state() {
            PlaybackState::Playing => self.engine.pause(),
            PlaybackState::Paused => self.engine.resume(),
            PlaybackState::Buffering => debug!("Ignoring play/pause while buffering"),
            PlaybackState::Stopped => {
                if self.engine.track().is_some() && self.engine.target_state() != TargetState::Ready
                {
                    debug!("Start already in flight");
                } else if let Some(row) = self.sequencer.get_any() {
                    self.start(row);
                } else {
                    debug!("Playlist is empty, nothing to play");
                }
            }
        }
        self.dispatch();
    }

    /// Stop playback and reset navigation
    pub fn stop(&mut self) {
        self.stop_playback();
        self.dispatch();
    }

    /// Skip to the next track (no-op while stopped)
    pub fn next(&mut self) {
        if self.is_stopped() {
            return;
        }
        self.advance();
        self.dispatch();
    }

    /// Go back one track (no-op while stopped or at the start)
    pub fn prev(&mut self) {
        if self.is_stopped() {
            return;
        }
        match self.sequencer.get_prev() {
            Some(row) => self.start(row),
            None => debug!("No previous track"),
        }
        self.dispatch();
    }

    /// Play `row` right away
    pub fn play_handle(&mut self, row: Handle) -> Result<()> {
        self.sequencer.jump_to(row)?;
        self.start(row);
        self.dispatch();
        Ok(())
    }

    /// Seek to `fraction` (0.0-1.0) of the current track
    pub fn seek_fraction(&mut self, fraction: f64) -> Result<()> {
        self.engine.seek_fraction(fraction)?;
        self.dispatch();
        Ok(())
    }

    /// Change the perceptual volume by `delta`, returning the new level
    pub fn volume_delta(&mut self, delta: f64) -> f64 {
        let volume = (self.engine.volume() + delta).clamp(0.0, 1.0);
        self.engine.set_volume(volume);
        self.dispatch();
        volume
    }

    // ===== Modes =====

    /// Flip shuffle, returning the new mode
    pub fn toggle_shuffle(&mut self) -> bool {
        let shuffle = !self.sequencer.shuffle();
        self.sequencer.on_shuffle_toggled(shuffle);
        self.emit(ControllerEvent::ShuffleChanged(shuffle));
        shuffle
    }

    /// Flip repeat, returning the new mode
    pub fn toggle_repeat(&mut self) -> bool {
        let repeat = !self.sequencer.repeat();
        self.sequencer.set_repeat(repeat);
        self.emit(ControllerEvent::RepeatChanged(repeat));
        repeat
    }

    // ===== Playlist Editing =====

    /// Add tracks at the end of the playlist
    pub fn append(&mut self, tracks: Vec<Track>) -> Vec<Handle> {
        self.sequencer.append_many(tracks)
    }

    /// Replace the selection
    pub fn select(&mut self, rows: &[Handle]) {
        self.sequencer.select(rows);
    }

    /// Queue unqueued selected rows, dequeue queued ones
    pub fn toggle_queue_selection(&mut self) {
        let selection = self.sequencer.selection().to_vec();
        self.sequencer.toggle_queue(&selection);
    }

    /// Remove the selected rows; playback of a removed row continues
    pub fn remove_selection(&mut self) -> Vec<Track> {
        let removed = self.sequencer.remove_selection();
        self.forget_removed_row();
        removed
    }

    /// Keep only the selected rows
    pub fn crop_selection(&mut self) -> Vec<Track> {
        let removed = self.sequencer.crop_to_selection();
        self.forget_removed_row();
        removed
    }

    /// Move `rows` so they start at display position `to`
    pub fn move_rows(&mut self, rows: &[Handle], to: usize) -> Result<()> {
        self.sequencer.move_rows(rows, to)?;
        Ok(())
    }

    /// Stop and remove every row
    pub fn clear(&mut self) {
        self.stop_playback();
        self.sequencer.clear_all();
        self.dispatch();
    }

    // ===== Collaborators =====

    /// Flip the favorite mark of the playing track
    pub fn toggle_favorite(&mut self) -> Result<bool> {
        let track = self.engine.track().ok_or(ControllerError::NothingPlaying)?;
        let favorites = self
            .favorites
            .as_mut()
            .ok_or(ControllerError::MissingCollaborator("favorites store"))?;

        let favorite = favorites.toggle(track)?;
        let file = track.file().to_string();
        debug!(%file, favorite, "Toggled favorite");

        self.emit(ControllerEvent::FavoriteChanged { file, favorite });
        Ok(favorite)
    }

    /// Whether the playing track is a favorite
    pub fn is_current_favorite(&self) -> bool {
        match (self.engine.track(), &self.favorites) {
            (Some(track), Some(favorites)) => favorites.is_favorite(track.file()),
            _ => false,
        }
    }

    /// Write tags to the files of `rows`, then refresh every row and the
    /// engine's held track playing one of those files
    ///
    /// Returns the number of files written.
    pub fn edit_tags(
        &mut self,
        rows: &[Handle],
        mask: TagMask,
        values: &TagValues,
        progress: &mut dyn Progress,
    ) -> Result<usize> {
        let files = self.sequencer.files_of(rows);
        if files.is_empty() || mask.is_empty() {
            return Ok(0);
        }

        let editor = self
            .tag_editor
            .as_mut()
            .ok_or(ControllerError::MissingCollaborator("tag editor"))?;
        let written = editor.apply(&files, mask, values, progress)?;

        let change = self.sequencer.apply_tag_change(mask, values, &files);
        let holds_edited = self
            .engine
            .track()
            .is_some_and(|track| files.iter().any(|f| f == track.file()));
        if change.touches_current || holds_edited {
            self.engine.update_tags(mask, values);
        }

        for row in change.changed {
            self.emit(ControllerEvent::TagsChanged(row));
        }

        info!(files = written, "Edited tags");
        Ok(written)
    }

    /// Save the playlist and current position for the next session
    pub fn save_playlist(&mut self) -> Result<()> {
        self.sequencer.save(self.storage.as_mut())?;
        Ok(())
    }

    /// Replace the playlist with the one saved by [`Controller::save_playlist`]
    pub fn restore_playlist(&mut self, progress: &mut dyn Progress) -> Result<RestoreOutcome> {
        if self.playing.is_some() {
            self.stop_playback();
        }
        let outcome = self.sequencer.restore(self.storage.as_ref(), progress)?;
        self.dispatch();
        Ok(outcome)
    }

    // ===== Event Loop =====

    /// Apply one UI command
    pub fn apply(&mut self, command: Command) -> Result<()> {
        debug!(?command, "Applying command");

        match command {
            Command::PlayPause => self.play_pause_resume(),
            Command::Stop => self.stop(),
            Command::Next => self.next(),
            Command::Prev => self.prev(),
            Command::PlayRow(row) => self.play_handle(row)?,
            Command::SeekFraction(fraction) => self.seek_fraction(fraction)?,
            Command::VolumeDelta(delta) => {
                self.volume_delta(delta);
            }
            Command::ToggleShuffle => {
                self.toggle_shuffle();
            }
            Command::ToggleRepeat => {
                self.toggle_repeat();
            }
            Command::Append(tracks) => {
                self.append(tracks);
            }
            Command::Select(rows) => self.select(&rows),
            Command::ToggleQueueSelection => self.toggle_queue_selection(),
            Command::RemoveSelection => {
                self.remove_selection();
            }
            Command::CropSelection => {
                self.crop_selection();
            }
            Command::MoveRows { rows, to } => self.move_rows(&rows, to)?,
            Command::Clear => self.clear(),
            Command::ToggleFavorite => {
                self.toggle_favorite()?;
            }
            Command::EditTags { rows, mask, values } => {
                self.edit_tags(&rows, mask, &values, &mut NoProgress)?;
            }
        }
        Ok(())
    }

    /// One event-loop turn: drain the pipeline bus and react to the engine
    pub fn pump(&mut self) {
        self.engine.process_bus();
        self.dispatch();
    }

    /// Timer turn: position tick, buffering poll, then [`Controller::pump`]
    pub fn tick(&mut self) {
        self.engine.on_timer();
        self.pump();
    }

    /// Take all queued notifications in emission order
    pub fn drain_events(&mut self) -> Vec<ControllerEvent> {
        self.pending_events.drain(..).collect()
    }

    /// Drive the controller until `commands` closes or `shutdown` resolves
    ///
    /// The playlist is saved on the way out.
    pub async fn run<F>(&mut self, mut commands: mpsc::Receiver<Command>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut timer = interval(TICK_INTERVAL);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut bus_poll = interval(BUS_POLL_INTERVAL);
        bus_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Controller running");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                command = commands.recv() => match command {
                    Some(command) => {
                        if let Err(e) = self.apply(command) {
                            warn!(error = %e, "Command failed");
                        }
                    }
                    None => {
                        debug!("Command channel closed");
                        break;
                    }
                },
                _ = timer.tick() => self.tick(),
                _ = bus_poll.tick() => self.pump(),
            }

            self.flush_events();
        }

        self.save_playlist()?;
        self.flush_events();
        info!("Controller stopped");
        Ok(())
    }

    // ===== Accessors =====

    /// The playback engine
    pub fn engine(&self) -> &Engine<P> {
        &self.engine
    }

    /// The playback engine, mutably (equalizer, mute, pipeline access)
    pub fn engine_mut(&mut self) -> &mut Engine<P> {
        &mut self.engine
    }

    /// The playlist sequencer
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Row handed to the engine last
    pub fn playing(&self) -> Option<Handle> {
        self.playing
    }

    /// Confirmed playback state
    pub fn state(&self) -> PlaybackState {
        self.engine.state()
    }

    // ===== Internals =====

    fn is_stopped(&self) -> bool {
        self.engine.state() == PlaybackState::Stopped
            && self.engine.target_state() == TargetState::Ready
    }

    /// Hand `row` to the engine; failures go through the error path
    fn start(&mut self, row: Handle) {
        let Some(track) = self.sequencer.track(row) else {
            warn!(?row, "Cannot start a removed row");
            return;
        };
        self.engine.load(track);

        if let Some(previous) = self.playing.replace(row) {
            if previous != row {
                self.clear_icon(previous);
            }
        }
        self.emit(ControllerEvent::TrackChanged(Some(row)));

        if let Err(e) = self.engine.play() {
            self.fail(e.to_string(), false);
        }
    }

    fn advance(&mut self) {
        match self.sequencer.get_next() {
            Some(row) => self.start(row),
            None => {
                info!("Playlist ended");
                self.stop_playback();
                self.emit(ControllerEvent::PlaylistEnded);
            }
        }
    }

    fn stop_playback(&mut self) {
        self.engine.stop();
        self.sequencer.on_playback_stopped();
        self.last_error = None;
        self.failed_in_a_row = 0;
        self.follow_up = None;

        if self.playing.take().is_some() {
            self.emit(ControllerEvent::TrackChanged(None));
        }
    }

    /// Handle engine events until nothing is left to do
    fn dispatch(&mut self) {
        loop {
            self.engine.process_bus();
            let events = self.engine.drain_events();
            let idle = events.is_empty();

            for event in events {
                self.handle_engine_event(event);
            }

            match self.follow_up.take() {
                Some(FollowUp::Advance) => self.advance(),
                Some(FollowUp::Stop) => self.stop_playback(),
                None if idle => break,
                None => {}
            }
        }
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        debug!(event = event.name(), "Engine event");

        match event {
            EngineEvent::StateChanged(state) => {
                if let Some(row) = self.playing {
                    match state {
                        PlaybackState::Playing | PlaybackState::Buffering => {
                            self.set_icon(row, RowState::Playing)
                        }
                        PlaybackState::Paused => self.set_icon(row, RowState::Paused),
                        PlaybackState::Stopped => self.clear_icon(row),
                    }
                }
                if state == PlaybackState::Playing {
                    self.last_error = None;
                    self.failed_in_a_row = 0;
                }
                self.emit(ControllerEvent::StateChanged(state));
            }
            EngineEvent::Tick { position, duration } => {
                self.emit(ControllerEvent::Progress { position, duration });
            }
            EngineEvent::Finished => self.follow_up = Some(FollowUp::Advance),
            EngineEvent::Error(error) => self.fail(error.to_string(), error.is_not_found()),
            EngineEvent::Buffering(percent) => self.emit(ControllerEvent::Buffering(percent)),
            EngineEvent::TagsChanged(mask) => self.sync_stream_tags(mask),
            EngineEvent::DownloadDone { path } => {
                if let (Some(provider), Some(track)) = (self.provider.as_mut(), self.engine.track())
                {
                    if let Err(e) = provider.download_done(track, &path) {
                        warn!(%path, error = %e, "Provider rejected downloaded file");
                    }
                }
            }
            EngineEvent::Spectrum(magnitudes) => self.emit(ControllerEvent::Spectrum(magnitudes)),
            EngineEvent::VolumeChanged(volume) => self.emit(ControllerEvent::VolumeChanged(volume)),
            EngineEvent::PrepareSource(track) => self.prepare_source(&track),
            EngineEvent::CleanSource => {
                if self.provider_session {
                    self.provider_session = false;
                    if let Some(provider) = self.provider.as_mut() {
                        provider.clean_source();
                    }
                }
            }
        }
    }

    /// Resolve a provider track's URI and resume the waiting `play`
    fn prepare_source(&mut self, track: &Track) {
        let Some(provider) = self.provider.as_mut() else {
            self.fail(format!("No provider available for {}", track.file()), false);
            return;
        };

        match provider.prepare_source(track) {
            Ok(uri) => {
                debug!(file = %track.file(), "Provider prepared source");
                self.provider_session = true;
                self.engine.set_playback_uri(uri);
            }
            Err(e) => self.fail(e.to_string(), false),
        }
    }

    /// Copy stream tags from the engine's held track into the playlist rows
    fn sync_stream_tags(&mut self, mask: TagMask) {
        let Some(track) = self.engine.track() else {
            return;
        };
        let values = track.tag_values();
        let files = [track.file().to_string()];

        let change = self.sequencer.apply_tag_change(mask, &values, &files);
        for row in change.changed {
            self.emit(ControllerEvent::TagsChanged(row));
        }
    }

    /// Mark the playing row failed, report once, and decide what comes next
    fn fail(&mut self, message: String, missing: bool) {
        let row = self.playing;
        if let Some(row) = row {
            if let Err(e) = self.sequencer.mark_error(row, missing) {
                debug!(error = %e, "Failed row is gone");
            }
        }

        if self.last_error.as_deref() == Some(message.as_str()) {
            debug!(%message, "Suppressing repeated error");
        } else {
            warn!(%message, missing, "Playback failed");
            self.emit(ControllerEvent::Error {
                row,
                message: message.clone(),
                missing,
            });
            self.last_error = Some(message);
        }

        self.failed_in_a_row += 1;
        let budget = self.sequencer.len().max(1);
        self.follow_up = if self.ignore_errors && self.failed_in_a_row < budget {
            Some(FollowUp::Advance)
        } else {
            Some(FollowUp::Stop)
        };
    }

    fn set_icon(&mut self, row: Handle, state: RowState) {
        if let Err(PlaylistError::StaleHandle(_)) = self.sequencer.set_row_state(row, state) {
            debug!(?row, "Playing row was removed");
        }
    }

    /// Drop a Playing/Paused icon, keeping error marks
    fn clear_icon(&mut self, row: Handle) {
        if matches!(
            self.sequencer.row_state(row),
            Some(RowState::Playing | RowState::Paused)
        ) {
            self.set_icon(row, RowState::None);
        }
    }

    fn forget_removed_row(&mut self) {
        if let Some(row) = self.playing {
            if self.sequencer.get(row).is_none() {
                debug!(?row, "Playing row removed, playback continues");
                self.playing = None;
            }
        }
    }

    fn emit(&mut self, event: ControllerEvent) {
        self.pending_events.push_back(event);
    }

    /// Hand queued events to the sink (dropped when nobody listens)
    fn flush_events(&mut self) {
        let Some(sink) = &self.sink else {
            self.pending_events.clear();
            return;
        };

        let mut closed = false;
        for event in self.pending_events.drain(..) {
            if sink.send(event).is_err() {
                closed = true;
                break;
            }
        }

        if closed {
            warn!("Event receiver dropped, discarding further events");
            self.pending_events.clear();
            self.sink = None;
        }
    }
}
