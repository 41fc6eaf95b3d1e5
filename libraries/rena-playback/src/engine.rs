//! Playback engine - pipeline state machine
//!
//! Owns one [`Pipeline`] and one private copy of the loaded track. Commands
//! (`play`, `pause`, `seek`, ...) only *request* pipeline transitions; the
//! confirmed [`PlaybackState`] moves when the pipeline's bus says so. The one
//! exception is `stop`, which is evaluated synchronously because it only
//! clears local bookkeeping.
//!
//! The host's event loop calls [`Engine::process_bus`] whenever bus messages
//! may be pending and [`Engine::on_timer`] once per second, then hands
//! [`Engine::drain_events`] to its listeners.

use crate::{
    equalizer::{Equalizer, BAND_COUNT},
    error::{EngineError, Result},
    events::EngineEvent,
    pipeline::{
        BusMessage, BusReceiver, Pipeline, PipelineError, PipelineErrorKind, StateChangeReturn,
        StreamTags,
    },
    types::{EngineConfig, PipelineState, PlaybackState, TargetState},
    volume::Volume,
};
use rena_core::{SourceKind, TagMask, TagValues, Track};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Streaming playback engine
pub struct Engine<P: Pipeline> {
    pipeline: P,
    bus: BusReceiver,
    config: EngineConfig,

    // Confirmed and requested state
    state: PlaybackState,
    target_state: TargetState,

    // Track-scoped bookkeeping
    track: Option<Track>,
    prepared_uri: Option<String>,
    awaiting_source: bool,
    can_seek: Option<bool>,
    seeking: bool,
    emitted_error: bool,
    download_done: bool,

    // One-second timers: ticks while playing, buffering poll while caching
    tick_timer: bool,
    buffering_poll: bool,

    volume: Volume,
    equalizer: Equalizer,

    pending_events: VecDeque<EngineEvent>,
}

impl<P: Pipeline> Engine<P> {
    /// Create an engine driving `pipeline`, listening on `bus`
    pub fn new(mut pipeline: P, bus: BusReceiver, config: EngineConfig) -> Self {
        let volume = Volume::new(config.volume);
        let equalizer = Equalizer::new(config.equalizer);

        pipeline.set_volume(volume.gain());
        for (band, gain) in equalizer.bands().iter().enumerate() {
            pipeline.set_equalizer_band(band, *gain);
        }

        Self {
            pipeline,
            bus,
            config,
            state: PlaybackState::Stopped,
            target_state: TargetState::Ready,
            track: None,
            prepared_uri: None,
            awaiting_source: false,
            can_seek: None,
            seeking: false,
            emitted_error: false,
            download_done: false,
            tick_timer: false,
            buffering_poll: false,
            volume,
            equalizer,
            pending_events: VecDeque::new(),
        }
    }

    // ===== Playback Control =====

    /// Stop whatever plays and hold a private copy of `track`
    ///
    /// Nothing is opened yet; call [`Engine::play`] to start.
    pub fn load(&mut self, track: &Track) {
        self.stop();
        debug!(file = %track.file(), source = %track.source(), "Loading track");
        self.track = Some(track.clone());
    }

    /// Start playback of the loaded track
    ///
    /// Local tracks play from a `file://` URI and HTTP tracks as-is. Provider
    /// tracks first emit [`EngineEvent::PrepareSource`]; playback starts once
    /// the host answers with [`Engine::set_playback_uri`].
    pub fn play(&mut self) -> Result<()> {
        let track = self.track.as_ref().ok_or(EngineError::NoTrackLoaded)?;

        let uri = match track.direct_uri()?.or_else(|| self.prepared_uri.clone()) {
            Some(uri) => uri,
            None => {
                debug!(file = %track.file(), "Waiting for provider to prepare source");
                let pending = track.clone();
                self.awaiting_source = true;
                self.emit(EngineEvent::PrepareSource(pending));
                return Ok(());
            }
        };

        self.start(&uri);
        Ok(())
    }

    /// Provide the resolved URI for a provider track
    ///
    /// Resumes a `play` that was waiting on [`EngineEvent::PrepareSource`].
    pub fn set_playback_uri(&mut self, uri: impl Into<String>) {
        let uri = uri.into();
        self.prepared_uri = Some(uri.clone());

        if self.awaiting_source && self.track.is_some() {
            self.awaiting_source = false;
            self.start(&uri);
        }
    }

    fn start(&mut self, uri: &str) {
        let network = self
            .track
            .as_ref()
            .is_some_and(|track| track.source().is_network());

        info!(uri, "Starting playback");

        self.emitted_error = false;
        self.seeking = false;
        self.can_seek = None;
        self.download_done = false;

        self.pipeline.set_uri(uri);
        self.pipeline.set_download(self.config.local_storage && network);
        self.set_target_state(TargetState::Playing);
    }

    /// Pause playback (ignored while buffering)
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Buffering || self.track.is_none() {
            return;
        }
        self.set_target_state(TargetState::Paused);
    }

    /// Resume playback (ignored while buffering)
    pub fn resume(&mut self) {
        if self.state == PlaybackState::Buffering || self.track.is_none() {
            return;
        }
        self.set_target_state(TargetState::Playing);
    }

    /// Stop playback and release the held track
    ///
    /// Emits [`EngineEvent::CleanSource`] when a track was held, so calling
    /// `stop` twice in a row does nothing the second time.
    pub fn stop(&mut self) {
        let had_track = self.track.take().is_some();
        self.prepared_uri = None;
        self.awaiting_source = false;
        self.seeking = false;
        self.cancel_timers();

        if self.target_state != TargetState::Ready || self.state != PlaybackState::Stopped {
            self.set_target_state(TargetState::Ready);
        }

        self.discard_stale_messages();

        if had_track {
            self.emit(EngineEvent::CleanSource);
        }
    }

    /// Seek to `position` in the current stream
    ///
    /// Only allowed once the stream reported itself seekable. Completion is
    /// signalled by a [`EngineEvent::Tick`] when the pipeline settles.
    pub fn seek(&mut self, position: Duration) -> Result<()> {
        if self.track.is_none() {
            return Err(EngineError::NoTrackLoaded);
        }
        if !self.can_seek() {
            return Err(EngineError::NotSeekable);
        }
        if let Some(duration) = self.pipeline.query_duration() {
            if position > duration {
                return Err(EngineError::InvalidSeekPosition(position));
            }
        }

        if !self.pipeline.seek(position) {
            return Err(EngineError::SeekRejected(position));
        }

        debug!(?position, "Seek requested");
        self.seeking = true;
        Ok(())
    }

    /// Seek to a fraction (0.0-1.0) of the track length
    pub fn seek_fraction(&mut self, fraction: f64) -> Result<()> {
        if !fraction.is_finite() {
            return Err(EngineError::InvalidSeekFraction(fraction));
        }
        let duration = self
            .duration()
            .or_else(|| {
                self.track
                    .as_ref()
                    .map(|track| Duration::from_secs(u64::from(track.length)))
            })
            .ok_or(EngineError::NoTrackLoaded)?;

        self.seek(duration.mul_f64(fraction.clamp(0.0, 1.0)))
    }

    // ===== Volume & Equalizer =====

    /// Set perceptual volume (0.0-1.0)
    ///
    /// [`EngineEvent::VolumeChanged`] follows once the mixer reports back.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume.set_level(volume);
        self.pipeline.set_volume(self.volume.gain());
    }

    /// Perceptual volume (0.0-1.0)
    pub fn volume(&self) -> f64 {
        self.volume.level()
    }

    /// Mute or unmute
    pub fn set_mute(&mut self, mute: bool) {
        self.pipeline.set_mute(mute);
    }

    /// Whether output is muted
    pub fn is_muted(&self) -> bool {
        self.pipeline.is_muted()
    }

    /// Set one equalizer band (dB, clamped)
    pub fn set_equalizer_band(&mut self, band: usize, gain_db: f64) -> Result<()> {
        let gain = self.equalizer.set_band(band, gain_db)?;
        self.pipeline.set_equalizer_band(band, gain);
        Ok(())
    }

    /// Replace all bands with a named preset
    pub fn apply_equalizer_preset(&mut self, name: &str) -> Result<()> {
        self.equalizer.apply_preset(name)?;
        for (band, gain) in self.equalizer.bands().iter().enumerate() {
            self.pipeline.set_equalizer_band(band, *gain);
        }
        Ok(())
    }

    /// Current equalizer gains
    pub fn equalizer_bands(&self) -> [f64; BAND_COUNT] {
        self.equalizer.bands()
    }

    // ===== Tags =====

    /// Push an external tag edit into the held copy of the track
    ///
    /// Returns the fields that changed; emits nothing, the editor already knows.
    pub fn update_tags(&mut self, mask: TagMask, values: &TagValues) -> TagMask {
        self.track
            .as_mut()
            .map(|track| track.apply_tags(mask, values))
            .unwrap_or_default()
    }

    // ===== State Queries =====

    /// Confirmed playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Requested pipeline state
    pub fn target_state(&self) -> TargetState {
        self.target_state
    }

    /// Whether playback is confirmed running
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// The engine's copy of the loaded track
    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    /// Whether the current stream is known to be seekable
    pub fn can_seek(&self) -> bool {
        self.can_seek.unwrap_or(false)
    }

    /// Current position in the stream
    pub fn position(&self) -> Duration {
        self.pipeline.query_position().unwrap_or_default()
    }

    /// Stream duration, when known
    pub fn duration(&self) -> Option<Duration> {
        self.pipeline.query_duration()
    }

    /// Configuration the engine was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Enable or disable local caching of network streams
    ///
    /// Takes effect on the next `play`.
    pub fn set_local_storage(&mut self, enabled: bool) {
        self.config.local_storage = enabled;
    }

    /// The driven pipeline
    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// The driven pipeline, mutably
    pub fn pipeline_mut(&mut self) -> &mut P {
        &mut self.pipeline
    }

    // ===== Event Loop Hooks =====

    /// Drain and handle every pending bus message, in order
    pub fn process_bus(&mut self) {
        while let Ok(message) = self.bus.try_recv() {
            self.handle_message(message);
        }
    }

    /// One-second timer hook
    ///
    /// Emits a tick while playing and polls the buffering query while a
    /// network track is being cached locally.
    pub fn on_timer(&mut self) {
        if self.tick_timer && self.state == PlaybackState::Playing {
            self.emit_tick();
        }

        if self.buffering_poll {
            if let Some(status) = self.pipeline.query_buffering() {
                if status.percent >= 100 && !self.download_done {
                    if let Some(path) = status.temp_file {
                        info!(%path, "Network track fully cached");
                        self.download_done = true;
                        self.buffering_poll = false;
                        self.emit(EngineEvent::DownloadDone { path });
                    }
                }
                self.update_buffering(status.percent);
            }
        }
    }

    /// Take all queued events in emission order
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.pending_events.drain(..).collect()
    }

    // ===== State Machine =====

    fn set_target_state(&mut self, target: TargetState) {
        self.target_state = target;

        match self.pipeline.set_state(target.into()) {
            StateChangeReturn::Success | StateChangeReturn::Async => {}
            StateChangeReturn::NoPreroll => debug!("Live source, no preroll"),
            StateChangeReturn::Failure => {
                if target != TargetState::Ready {
                    self.handle_error(PipelineError::new(
                        PipelineErrorKind::StateChange,
                        format!("Pipeline refused to change state to {target:?}"),
                    ));
                    return;
                }
                warn!("Pipeline refused to go to READY");
            }
        }

        if target == TargetState::Ready {
            self.evaluate_state(PipelineState::Ready);
        }
    }

    fn evaluate_state(&mut self, new: PipelineState) {
        match new {
            PipelineState::Playing if self.target_state == TargetState::Playing => {
                if self.can_seek.is_none() {
                    let seekable = self.pipeline.query_seekable();
                    debug!(seekable, "Queried seekability");
                    self.can_seek = Some(seekable);
                }

                self.tick_timer = true;
                let caching = self.config.local_storage
                    && !self.download_done
                    && self
                        .track
                        .as_ref()
                        .is_some_and(|track| track.source().is_network());
                self.buffering_poll = caching;

                // Buffering is left through update_buffering, not here
                if self.state != PlaybackState::Buffering {
                    self.set_state(PlaybackState::Playing);
                }
            }
            PipelineState::Paused if self.target_state == TargetState::Paused => {
                self.cancel_timers();
                self.set_state(PlaybackState::Paused);
            }
            PipelineState::Ready | PipelineState::Null
                if self.target_state == TargetState::Ready =>
            {
                self.cancel_timers();
                self.set_state(PlaybackState::Stopped);
            }
            _ => {}
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        debug!(from = ?self.state, to = ?state, "Playback state changed");
        self.state = state;
        self.emit(EngineEvent::StateChanged(state));
    }

    fn handle_message(&mut self, message: BusMessage) {
        match message {
            BusMessage::StateChanged { old, new, pending } => {
                if pending == PipelineState::VoidPending {
                    debug!(?old, ?new, "Pipeline settled");
                    self.evaluate_state(new);
                }
            }
            BusMessage::Eos => self.handle_eos(),
            BusMessage::Error(error) => self.handle_error(error),
            BusMessage::Buffering(percent) => {
                if self.track.is_some() {
                    self.update_buffering(percent);
                    self.emit(EngineEvent::Buffering(percent));
                }
            }
            BusMessage::Tag(tags) => self.handle_tags(tags),
            BusMessage::AsyncDone => {
                if self.seeking {
                    self.seeking = false;
                    self.emit_tick();
                }
            }
            BusMessage::Spectrum(magnitudes) => {
                if self.state == PlaybackState::Playing {
                    self.emit(EngineEvent::Spectrum(magnitudes));
                }
            }
            BusMessage::VolumeChanged(linear) => {
                if self.volume.sync_from_linear(linear) {
                    self.emit(EngineEvent::VolumeChanged(self.volume.level()));
                }
            }
        }
    }

    fn handle_eos(&mut self) {
        if self.track.is_none() {
            return;
        }
        if self.emitted_error {
            debug!("Ignoring end of stream after an error");
            return;
        }

        info!("End of stream");
        self.cancel_timers();
        self.emit(EngineEvent::Finished);
    }

    fn handle_error(&mut self, error: PipelineError) {
        if self.emitted_error && error.kind == PipelineErrorKind::StreamFailed {
            debug!(%error, "Ignoring follow-up stream error");
            return;
        }

        warn!(kind = ?error.kind, %error, "Playback error");

        self.emitted_error = true;
        self.seeking = false;
        self.awaiting_source = false;
        self.cancel_timers();
        self.set_target_state(TargetState::Ready);

        // A track ends in exactly one of Finished or Error
        self.pending_events
            .retain(|event| !matches!(event, EngineEvent::Finished));
        self.emit(EngineEvent::Error(error));
    }

    fn handle_tags(&mut self, tags: StreamTags) {
        let Some(track) = self.track.as_mut() else {
            return;
        };
        if track.source() != SourceKind::Http {
            return;
        }

        let mut mask = TagMask::NONE;
        let mut values = track.tag_values();
        if let Some(title) = tags.title {
            values.title = title;
            mask |= TagMask::TITLE;
        }
        if let Some(artist) = tags.artist {
            values.artist = artist;
            mask |= TagMask::ARTIST;
        }

        let changed = track.apply_tags(mask, &values);
        if !changed.is_empty() {
            debug!(title = %track.title, artist = %track.artist, "Stream tags changed");
            self.emit(EngineEvent::TagsChanged(changed));
        }
    }

    fn update_buffering(&mut self, percent: u8) {
        // Never race a stop in progress, nor a pause still settling
        if self.target_state != TargetState::Playing {
            return;
        }

        if percent < 100 {
            if self.state == PlaybackState::Playing {
                debug!(percent, "Buffer ran short, pausing");
                self.pipeline.set_state(PipelineState::Paused);
                self.set_state(PlaybackState::Buffering);
            }
        } else if self.state == PlaybackState::Buffering {
            debug!("Buffer full, resuming");
            self.pipeline.set_state(PipelineState::Playing);
            self.set_state(PlaybackState::Playing);
        }
    }

    fn emit_tick(&mut self) {
        let position = self.position();
        let duration = self.duration();
        self.emit(EngineEvent::Tick { position, duration });
    }

    fn cancel_timers(&mut self) {
        self.tick_timer = false;
        self.buffering_poll = false;
    }

    /// Drop track-scoped messages still queued from before a stop
    fn discard_stale_messages(&mut self) {
        while let Ok(message) = self.bus.try_recv() {
            match message {
                BusMessage::VolumeChanged(_) => self.handle_message(message),
                other => debug!(?other, "Discarding stale bus message"),
            }
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        self.pending_events.push_back(event);
    }
}

impl<P: Pipeline> std::fmt::Debug for Engine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("target_state", &self.target_state)
            .field("track", &self.track.as_ref().map(Track::file))
            .field("can_seek", &self.can_seek)
            .field("emitted_error", &self.emitted_error)
            .finish_non_exhaustive()
    }
}
