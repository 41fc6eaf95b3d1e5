//! Rena - Playback Engine
//!
//! A state machine over an external media pipeline.
//!
//! This crate provides:
//! - The [`Pipeline`] trait a media framework wrapper implements
//! - A thread-safe bus for the pipeline's asynchronous notifications
//! - [`Engine`]: load / play / pause / resume / stop / seek, confirmed
//!   asynchronously against the pipeline
//! - Perceptual (cubic) volume, ten-band equalizer
//! - Network buffering, local caching of streams, stream tags
//! - Error recovery with suppression of follow-up errors
//!
//! # Architecture
//!
//! `rena-playback` does not decode audio. The host wraps its media framework
//! in a [`Pipeline`], gives the pipeline the sending half of a [`bus`], and
//! drives the engine from its event loop:
//!
//! ```rust
//! use rena_playback::{bus, Engine, EngineConfig, MockPipeline, PipelineState, PlaybackState};
//! use rena_core::Track;
//!
//! let (sender, receiver) = bus();
//! let mut engine = Engine::new(MockPipeline::new(sender), receiver, EngineConfig::default());
//!
//! let track = Track::from_local_path("/music/song.flac").unwrap();
//! engine.load(&track);
//! engine.play().unwrap();
//!
//! // Nothing is confirmed until the pipeline says so
//! assert_eq!(engine.state(), PlaybackState::Stopped);
//!
//! engine.pipeline_mut().confirm(PipelineState::Playing);
//! engine.process_bus();
//! assert_eq!(engine.state(), PlaybackState::Playing);
//!
//! for event in engine.drain_events() {
//!     println!("{}", event.name());
//! }
//! ```

mod engine;
mod equalizer;
mod error;
mod events;
pub mod pipeline;
pub mod types;
pub mod volume;

#[cfg(any(test, feature = "test-support"))]
mod mock;

// Public exports
pub use engine::Engine;
pub use equalizer::{Equalizer, BAND_COUNT, BAND_FREQUENCIES, PRESETS};
pub use error::{EngineError, Result};
pub use events::EngineEvent;
pub use pipeline::{
    bus, BufferingStatus, BusMessage, BusReceiver, BusSender, Pipeline, PipelineError,
    PipelineErrorKind, StateChangeReturn, StreamTags,
};
pub use types::{EngineConfig, PipelineState, PlaybackState, TargetState};

#[cfg(any(test, feature = "test-support"))]
pub use mock::MockPipeline;
