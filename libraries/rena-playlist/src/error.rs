//! Error types for the playlist sequencer

use crate::arena::Handle;
use rena_core::RenaError;
use thiserror::Error;

/// Sequencer errors
///
/// Running out of tracks is not an error: `get_next` / `get_prev` return
/// `None` at the end of the playlist.
#[derive(Debug, Error)]
pub enum PlaylistError {
    /// The row behind this handle was removed
    #[error("Stale row handle: {0:?}")]
    StaleHandle(Handle),

    /// Position past the end of the playlist
    #[error("Position {position} out of range (playlist has {len} rows)")]
    PositionOutOfRange { position: usize, len: usize },

    /// Storage or track construction failed
    #[error(transparent)]
    Core(#[from] RenaError),
}

/// Result type for sequencer operations
pub type Result<T> = std::result::Result<T, PlaylistError>;
