//! Core types for the playback engine

use crate::equalizer::BAND_COUNT;
use serde::{Deserialize, Serialize};

/// Confirmed playback state, as reported to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No stream running
    Stopped,

    /// Pipeline confirmed PAUSED at the user's request
    Paused,

    /// Pipeline confirmed PLAYING
    Playing,

    /// Network data ran short while playing; pipeline paused by the engine
    Buffering,
}

/// State the engine has asked the pipeline to reach
///
/// Differs from [`PlaybackState`] while a transition is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetState {
    /// Stream torn down, pipeline idle
    Ready,

    /// Pipeline prerolled but not running
    Paused,

    /// Pipeline running
    Playing,
}

/// Pipeline-level states, mirroring the media framework's own lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// No pending transition (only meaningful as the `pending` field)
    VoidPending,
    /// Resources released
    Null,
    /// Allocated, no stream
    Ready,
    /// Prerolled
    Paused,
    /// Running
    Playing,
}

impl From<TargetState> for PipelineState {
    fn from(target: TargetState) -> Self {
        match target {
            TargetState::Ready => PipelineState::Ready,
            TargetState::Paused => PipelineState::Paused,
            TargetState::Playing => PipelineState::Playing,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initial perceptual volume in [0, 1] (default: 0.5)
    pub volume: f64,

    /// Initial equalizer gains in dB (default: flat)
    pub equalizer: [f64; BAND_COUNT],

    /// Cache network streams to a local file while playing (default: false)
    pub local_storage: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volume: 0.5,
            equalizer: [0.0; BAND_COUNT],
            local_storage: false,
        }
    }
}
