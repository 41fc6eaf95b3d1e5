//! Row and configuration types for the playlist sequencer

use crate::arena::Handle;
use rena_core::Track;
use serde::{Deserialize, Serialize};

/// Status icon shown next to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowState {
    /// Nothing to show
    #[default]
    None,
    /// Row is the one playing
    Playing,
    /// Row is the one paused
    Paused,
    /// Playback of the row failed
    Error,
    /// The row's file or stream could not be found
    Missing,
}

/// One playlist row
#[derive(Debug, Clone)]
pub struct Entry {
    pub(crate) track: Track,
    pub(crate) played: bool,
    pub(crate) row_state: RowState,
    pub(crate) queue_label: Option<usize>,
}

impl Entry {
    pub(crate) fn new(track: Track) -> Self {
        Self {
            track,
            played: false,
            row_state: RowState::None,
            queue_label: None,
        }
    }

    /// The row's track
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Whether the row was handed out since the last reset
    pub fn is_played(&self) -> bool {
        self.played
    }

    /// Status icon
    pub fn row_state(&self) -> RowState {
        self.row_state
    }

    /// 1-based position in the manual queue, if queued
    pub fn queue_label(&self) -> Option<usize> {
        self.queue_label
    }
}

/// Sequencer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Pick tracks at random
    pub shuffle: bool,
    /// Start over when the playlist runs out
    pub repeat: bool,
}

/// Rows touched by a tag edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagChange {
    /// Rows whose tags actually changed, in display order
    pub changed: Vec<Handle>,
    /// The row last handed to the engine was among them
    pub touches_current: bool,
}

/// Result of restoring a saved playlist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Rows restored
    pub restored: usize,
    /// References that no longer resolve to a track
    pub skipped: usize,
    /// The row that was current when the playlist was saved
    pub current: Option<Handle>,
}
