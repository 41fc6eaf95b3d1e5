//! Error types for the playback engine

use rena_core::RenaError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by engine operations
///
/// Failures reported by the pipeline while it runs are not returned here;
/// they arrive asynchronously as `EngineEvent::Error`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No track is currently loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// The current stream does not support seeking (or has not started yet)
    #[error("Stream is not seekable")]
    NotSeekable,

    /// Invalid seek position
    #[error("Invalid seek position: {0:?}")]
    InvalidSeekPosition(Duration),

    /// Seek fraction is not a finite number
    #[error("Invalid seek fraction: {0}")]
    InvalidSeekFraction(f64),

    /// The pipeline refused a seek request
    #[error("Seek to {0:?} was rejected by the pipeline")]
    SeekRejected(Duration),

    /// Equalizer band index out of range
    #[error("Equalizer band out of range: {0}")]
    InvalidBand(usize),

    /// Unknown equalizer preset
    #[error("Unknown equalizer preset: {0}")]
    UnknownPreset(String),

    /// Track-level failure (URI resolution)
    #[error(transparent)]
    Core(#[from] RenaError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
