//! Rena - Playlist Sequencer
//!
//! Decides what plays next.
//!
//! This crate provides:
//! - An ordered playlist addressed through stable, generation-checked handles
//! - Manual queue ("play next") with dense 1, 2, 3, ... labels
//! - Shuffle with a faithful undo history (previous replays what you heard)
//! - Repeat for both sequential and shuffled play
//! - Removal, crop, drag-reorder, row icons and tag propagation
//! - Save / restore through the `PlaylistStorage` collaborator
//!
//! # Example: Sequential Play
//!
//! ```rust
//! use rena_core::Track;
//! use rena_playlist::{Sequencer, SequencerConfig};
//!
//! let mut sequencer = Sequencer::new(SequencerConfig::default());
//! let a = sequencer.append(Track::from_local_path("/music/a.flac").unwrap());
//! let b = sequencer.append(Track::from_local_path("/music/b.flac").unwrap());
//!
//! assert_eq!(sequencer.get_any(), Some(a));
//! assert_eq!(sequencer.get_next(), Some(b));
//! assert_eq!(sequencer.get_next(), None);
//! assert_eq!(sequencer.get_prev(), Some(a));
//! ```
//!
//! # Example: Queue Priority
//!
//! ```rust
//! use rena_core::Track;
//! use rena_playlist::{Sequencer, SequencerConfig};
//!
//! let mut sequencer = Sequencer::new(SequencerConfig { shuffle: true, repeat: false });
//! let rows = sequencer.append_many(
//!     ["a", "b", "c"].map(|n| Track::from_local_path(format!("/music/{n}.flac")).unwrap()),
//! );
//!
//! sequencer.toggle_queue(&[rows[2]]);
//! assert_eq!(sequencer.queue_label(rows[2]), Some(1));
//! assert_eq!(sequencer.get_next(), Some(rows[2]));
//! assert!(sequencer.queue().is_empty());
//! ```

mod arena;
mod editing;
mod error;
mod persistence;
mod sequencer;
pub mod types;

// Public exports
pub use arena::Handle;
pub use error::{PlaylistError, Result};
pub use sequencer::Sequencer;
pub use types::{Entry, RestoreOutcome, RowState, SequencerConfig, TagChange};
