//! Media pipeline abstraction
//!
//! The engine never decodes audio itself. It drives a [`Pipeline`] (a thin
//! wrapper around whatever media framework the host links) and listens to the
//! pipeline's bus. Bus messages may be posted from any of the framework's
//! worker threads; the engine drains them on the event-loop thread.

use crate::types::PipelineState;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Synchronous answer to a state-change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeReturn {
    /// Reached immediately (a confirmation is still posted on the bus)
    Success,
    /// Transition continues in the background
    Async,
    /// Live source, no preroll possible
    NoPreroll,
    /// The pipeline refused the transition
    Failure,
}

/// Classification of a pipeline failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineErrorKind {
    /// The resource (file, URL) does not exist
    ResourceNotFound,
    /// Generic "internal data flow" failure, usually a follow-up of another error
    StreamFailed,
    /// Stream could not be decoded
    Decode,
    /// Network transport failure
    Network,
    /// The pipeline refused a state change
    StateChange,
    /// Anything else
    Other,
}

/// Failure reported by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineError {
    /// Failure class
    pub kind: PipelineErrorKind,
    /// Human readable message
    pub message: String,
    /// Framework debug detail, if any
    pub debug: Option<String>,
}

impl PipelineError {
    /// Create a pipeline error without debug detail
    pub fn new(kind: PipelineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            debug: None,
        }
    }

    /// Whether this error means the resource is missing
    pub fn is_not_found(&self) -> bool {
        self.kind == PipelineErrorKind::ResourceNotFound
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.debug {
            Some(debug) => write!(f, "{} ({debug})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Tags found inside a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamTags {
    /// Stream title (radio "now playing")
    pub title: Option<String>,
    /// Stream artist
    pub artist: Option<String>,
}

/// Answer to a buffering query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferingStatus {
    /// Buffer fill (0-100)
    pub percent: u8,
    /// Temporary file holding the downloaded stream, when downloading
    pub temp_file: Option<String>,
}

/// Asynchronous notifications posted by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    /// The pipeline changed state
    StateChanged {
        /// Previous state
        old: PipelineState,
        /// New state
        new: PipelineState,
        /// Next state still queued (`VoidPending` once settled)
        pending: PipelineState,
    },
    /// End of stream
    Eos,
    /// Transport or decode failure
    Error(PipelineError),
    /// Network buffer fill changed (0-100)
    Buffering(u8),
    /// Tags found in the stream
    Tag(StreamTags),
    /// An asynchronous operation (preroll, flushing seek) settled
    AsyncDone,
    /// Spectrum analyser magnitudes in dB
    Spectrum(Vec<f32>),
    /// Mixer volume changed (linear), usually from the driver's thread
    VolumeChanged(f64),
}

/// Sending half of a pipeline bus
///
/// Cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct BusSender(Sender<BusMessage>);

/// Receiving half of the bus, drained by the engine
pub type BusReceiver = Receiver<BusMessage>;

impl BusSender {
    /// Post a message; silently dropped once the engine is gone
    pub fn post(&self, message: BusMessage) {
        self.0.send(message).ok();
    }
}

/// Create a bus: pipelines keep the sender, the engine owns the receiver
pub fn bus() -> (BusSender, BusReceiver) {
    let (tx, rx) = unbounded();
    (BusSender(tx), rx)
}

/// Media framework pipeline driven by the engine
///
/// Every call returns immediately. Results of state changes and seeks are
/// delivered later through the bus.
pub trait Pipeline {
    /// URI the next PLAYING transition should open
    fn set_uri(&mut self, uri: &str);

    /// Request a state transition
    fn set_state(&mut self, state: PipelineState) -> StateChangeReturn;

    /// Whether the current stream supports seeking
    fn query_seekable(&mut self) -> bool;

    /// Current stream position
    fn query_position(&self) -> Option<Duration>;

    /// Current stream duration
    fn query_duration(&self) -> Option<Duration>;

    /// Flushing, key-unit seek; `false` when refused outright
    fn seek(&mut self, position: Duration) -> bool;

    /// Set mixer volume (linear scale)
    fn set_volume(&mut self, linear: f64);

    /// Mixer volume (linear scale)
    fn volume(&self) -> f64;

    /// Mute or unmute the mixer
    fn set_mute(&mut self, mute: bool);

    /// Whether the mixer is muted
    fn is_muted(&self) -> bool;

    /// Set one equalizer band gain in dB
    fn set_equalizer_band(&mut self, band: usize, gain_db: f64);

    /// Enable caching of network streams to a temporary file
    fn set_download(&mut self, enabled: bool);

    /// Current buffering status, if the pipeline is buffering anything
    fn query_buffering(&mut self) -> Option<BufferingStatus>;
}
