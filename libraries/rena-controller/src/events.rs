//! Controller commands and notifications
//!
//! The UI sends [`Command`]s to the run loop and receives
//! [`ControllerEvent`]s from `Controller::drain_events`.

use rena_core::{TagMask, TagValues, Track};
use rena_playback::PlaybackState;
use rena_playlist::Handle;
use std::time::Duration;

/// Commands sent to the controller's run loop
#[derive(Debug, Clone)]
pub enum Command {
    /// Play when stopped, pause when playing, resume when paused
    PlayPause,

    /// Stop playback and reset navigation
    Stop,

    /// Skip to next track
    Next,

    /// Go to previous track
    Prev,

    /// Play a specific row
    PlayRow(Handle),

    /// Seek to a fraction (0.0-1.0) of the track
    SeekFraction(f64),

    /// Change perceptual volume by a delta
    VolumeDelta(f64),

    /// Toggle shuffle
    ToggleShuffle,

    /// Toggle repeat
    ToggleRepeat,

    /// Add rows at the end of the playlist
    Append(Vec<Track>),

    /// Replace the selection
    Select(Vec<Handle>),

    /// Queue / dequeue the selected rows
    ToggleQueueSelection,

    /// Remove the selected rows
    RemoveSelection,

    /// Keep only the selected rows
    CropSelection,

    /// Move rows (drag and drop)
    MoveRows {
        rows: Vec<Handle>,
        to: usize,
    },

    /// Remove every row
    Clear,

    /// Flip the favorite mark of the playing track
    ToggleFavorite,

    /// Write tags to the given rows' files
    EditTags {
        rows: Vec<Handle>,
        mask: TagMask,
        values: TagValues,
    },
}

/// Notifications for the UI
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// A new row was handed to the engine (`None` once playback stopped)
    TrackChanged(Option<Handle>),

    /// Confirmed playback state changed
    StateChanged(PlaybackState),

    /// Position update
    Progress {
        position: Duration,
        duration: Option<Duration>,
    },

    /// Network buffer fill (0-100)
    Buffering(u8),

    /// A row's tags changed (stream tags or an edit)
    TagsChanged(Handle),

    /// Perceptual volume changed
    VolumeChanged(f64),

    /// Spectrum analyser magnitudes in dB
    Spectrum(Vec<f32>),

    /// Playback failed; reported once per distinct failure
    Error {
        row: Option<Handle>,
        message: String,
        /// The file or stream could not be found
        missing: bool,
    },

    /// The playlist ran out
    PlaylistEnded,

    /// Shuffle was switched
    ShuffleChanged(bool),

    /// Repeat was switched
    RepeatChanged(bool),

    /// Favorite mark of a file changed
    FavoriteChanged {
        file: String,
        favorite: bool,
    },
}
