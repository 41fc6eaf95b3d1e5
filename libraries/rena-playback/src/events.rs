//! Engine events
//!
//! Everything the engine has to tell its listeners is queued as an
//! [`EngineEvent`] and handed out in emission order by `Engine::drain_events`.
//! For one track the order is always: tag updates, ticks, then either
//! `Finished` or `Error` (never both).

use crate::pipeline::PipelineError;
use crate::types::PlaybackState;
use rena_core::{TagMask, Track};
use std::time::Duration;

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Confirmed playback state changed
    StateChanged(PlaybackState),

    /// Periodic position update while playing (also right after a seek settles)
    Tick {
        /// Current position
        position: Duration,
        /// Stream duration, when known
        duration: Option<Duration>,
    },

    /// Track reached its end
    Finished,

    /// Pipeline failure; the engine already returned to a neutral state
    Error(PipelineError),

    /// Network buffer fill (0-100)
    Buffering(u8),

    /// Stream tags changed the held track (HTTP streams only)
    TagsChanged(TagMask),

    /// Local caching of the current network track is complete
    DownloadDone {
        /// Fully buffered temporary file
        path: String,
    },

    /// Spectrum analyser magnitudes in dB
    Spectrum(Vec<f32>),

    /// Perceptual volume changed
    VolumeChanged(f64),

    /// The track needs a provider-resolved URI before playback can start
    PrepareSource(Track),

    /// Playback of the held track ended; release attached session resources
    CleanSource,
}

impl EngineEvent {
    /// Short name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::StateChanged(_) => "state-changed",
            EngineEvent::Tick { .. } => "tick",
            EngineEvent::Finished => "finished",
            EngineEvent::Error(_) => "error",
            EngineEvent::Buffering(_) => "buffering",
            EngineEvent::TagsChanged(_) => "tags-changed",
            EngineEvent::DownloadDone { .. } => "download-done",
            EngineEvent::Spectrum(_) => "spectrum",
            EngineEvent::VolumeChanged(_) => "volume-changed",
            EngineEvent::PrepareSource(_) => "prepare-source",
            EngineEvent::CleanSource => "clean-source",
        }
    }
}
