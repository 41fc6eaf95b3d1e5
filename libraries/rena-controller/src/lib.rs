//! Rena Playback Controller
//!
//! Wires UI intents to the playlist sequencer and the playback engine, and
//! relays engine events back into playlist state.
//!
//! # Features
//!
//! - Play / pause / resume, stop, next, previous, play a chosen row
//! - Auto-advance on end of stream, optional skip-on-error
//! - Provider source resolution, favorites and tag editing through injected collaborators
//! - Layered configuration (`rena.toml` + `RENA_` environment variables)
//! - JSON-file playlist storage for session save / restore
//! - Async run loop multiplexing commands, the position timer and shutdown
//!
//! # Architecture
//!
//! - `config`: `PlayerConfig` loading and validation
//! - `controller`: the `Controller` itself
//! - `events`: `Command`s in, `ControllerEvent`s out
//! - `storage`: `JsonPlaylistStorage`
//! - `logging`: tracing subscriber setup for host applications

pub mod config;
mod controller;
mod error;
pub mod events;
pub mod logging;
pub mod storage;

pub use config::PlayerConfig;
pub use controller::Controller;
pub use error::{ControllerError, Result};
pub use events::{Command, ControllerEvent};
pub use logging::init_tracing;
pub use storage::JsonPlaylistStorage;
