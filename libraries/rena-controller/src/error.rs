//! Controller error types

use rena_core::RenaError;
use rena_playback::EngineError;
use rena_playlist::PlaylistError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ControllerError>;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Playlist error: {0}")]
    Playlist(#[from] PlaylistError),

    #[error(transparent)]
    Core(#[from] RenaError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No {0} configured")]
    MissingCollaborator(&'static str),

    #[error("Nothing is playing")]
    NothingPlaying,
}

impl From<config::ConfigError> for ControllerError {
    fn from(err: config::ConfigError) -> Self {
        ControllerError::Config(err.to_string())
    }
}
