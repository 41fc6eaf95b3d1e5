//! Scriptable pipeline for tests
//!
//! Records every request the engine makes and lets the test decide when (and
//! whether) the pipeline confirms it, by posting bus messages explicitly.

use crate::equalizer::BAND_COUNT;
use crate::pipeline::{
    BufferingStatus, BusMessage, BusSender, Pipeline, PipelineError, PipelineErrorKind,
    StateChangeReturn, StreamTags,
};
use crate::types::PipelineState;
use std::time::Duration;

/// In-memory [`Pipeline`] driven by the test
#[derive(Debug)]
pub struct MockPipeline {
    bus: BusSender,

    /// Last URI set by the engine
    pub uri: Option<String>,
    /// Every state the engine requested, in order
    pub requested: Vec<PipelineState>,
    /// Last confirmed state
    pub current: PipelineState,
    /// Answer returned to `set_state`
    pub state_change_return: StateChangeReturn,
    /// Post a settled confirmation for every request automatically
    pub auto_confirm: bool,

    /// Answer to `query_seekable`
    pub seekable: bool,
    /// Number of `query_seekable` calls
    pub seekable_queries: usize,
    /// Reported position
    pub position: Option<Duration>,
    /// Reported duration
    pub duration: Option<Duration>,
    /// Seeks requested by the engine
    pub seeks: Vec<Duration>,
    /// Refuse seeks
    pub reject_seeks: bool,

    /// Linear mixer volume
    pub volume: f64,
    /// Mixer mute
    pub muted: bool,
    /// Equalizer gains
    pub bands: [f64; BAND_COUNT],
    /// Download (local caching) enabled
    pub download: bool,
    /// Answer to `query_buffering`
    pub buffering: Option<BufferingStatus>,
}

impl MockPipeline {
    /// Create a pipeline posting to `bus`
    pub fn new(bus: BusSender) -> Self {
        Self {
            bus,
            uri: None,
            requested: Vec::new(),
            current: PipelineState::Null,
            state_change_return: StateChangeReturn::Async,
            auto_confirm: false,
            seekable: true,
            seekable_queries: 0,
            position: Some(Duration::ZERO),
            duration: Some(Duration::from_secs(180)),
            seeks: Vec::new(),
            reject_seeks: false,
            volume: 1.0,
            muted: false,
            bands: [0.0; BAND_COUNT],
            download: false,
            buffering: None,
        }
    }

    /// Confirm reaching `state` (settled, nothing pending)
    pub fn confirm(&mut self, state: PipelineState) {
        let old = self.current;
        self.current = state;
        self.bus.post(BusMessage::StateChanged {
            old,
            new: state,
            pending: PipelineState::VoidPending,
        });
    }

    /// Post an intermediate transition that is still heading to `pending`
    pub fn transition(&mut self, state: PipelineState, pending: PipelineState) {
        let old = self.current;
        self.current = state;
        self.bus.post(BusMessage::StateChanged {
            old,
            new: state,
            pending,
        });
    }

    /// Post end of stream
    pub fn post_eos(&self) {
        self.bus.post(BusMessage::Eos);
    }

    /// Post an error of `kind`
    pub fn post_error(&self, kind: PipelineErrorKind, message: &str) {
        self.bus
            .post(BusMessage::Error(PipelineError::new(kind, message)));
    }

    /// Post a buffering level
    pub fn post_buffering(&self, percent: u8) {
        self.bus.post(BusMessage::Buffering(percent));
    }

    /// Post stream tags
    pub fn post_tags(&self, title: Option<&str>, artist: Option<&str>) {
        self.bus.post(BusMessage::Tag(StreamTags {
            title: title.map(str::to_string),
            artist: artist.map(str::to_string),
        }));
    }

    /// Post async-done (preroll or seek settled)
    pub fn post_async_done(&self) {
        self.bus.post(BusMessage::AsyncDone);
    }

    /// Post spectrum magnitudes
    pub fn post_spectrum(&self, magnitudes: Vec<f32>) {
        self.bus.post(BusMessage::Spectrum(magnitudes));
    }

    /// A clone of the bus sender, e.g. to post from another thread
    pub fn bus(&self) -> BusSender {
        self.bus.clone()
    }
}

impl Pipeline for MockPipeline {
    fn set_uri(&mut self, uri: &str) {
        self.uri = Some(uri.to_string());
    }

    fn set_state(&mut self, state: PipelineState) -> StateChangeReturn {
        self.requested.push(state);
        if self.auto_confirm && self.state_change_return != StateChangeReturn::Failure {
            self.confirm(state);
        }
        self.state_change_return
    }

    fn query_seekable(&mut self) -> bool {
        self.seekable_queries += 1;
        self.seekable
    }

    fn query_position(&self) -> Option<Duration> {
        self.position
    }

    fn query_duration(&self) -> Option<Duration> {
        self.duration
    }

    fn seek(&mut self, position: Duration) -> bool {
        if self.reject_seeks {
            return false;
        }
        self.seeks.push(position);
        self.position = Some(position);
        true
    }

    fn set_volume(&mut self, linear: f64) {
        self.volume = linear;
        self.bus.post(BusMessage::VolumeChanged(linear));
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_mute(&mut self, mute: bool) {
        self.muted = mute;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_equalizer_band(&mut self, band: usize, gain_db: f64) {
        if let Some(slot) = self.bands.get_mut(band) {
            *slot = gain_db;
        }
    }

    fn set_download(&mut self, enabled: bool) {
        self.download = enabled;
    }

    fn query_buffering(&mut self) -> Option<BufferingStatus> {
        self.buffering.clone()
    }
}
