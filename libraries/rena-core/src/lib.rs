//! Rena Core
//!
//! Shared building blocks for the Rena playback engine and playlist sequencer.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `SourceKind`, `TagMask`, `TagValues`
//! - **Collaborator Traits**: `PlaylistStorage`, `ProviderHooks`, `TagEditor`,
//!   `Favorites`, `Progress`
//! - **Error Handling**: Unified `RenaError` and `Result` types
//!
//! Everything that is not the engine or the sequencer (storage tables, tag
//! writers, remote providers) is reached through the traits in [`traits`], so
//! hosts inject the implementation they have instead of the crates looking it
//! up globally.
//!
//! # Example
//!
//! ```rust
//! use rena_core::{SourceKind, TagMask, TagValues, Track};
//!
//! let mut track = Track::from_url("http://radio.example.com/stream").unwrap();
//! assert_eq!(track.source(), SourceKind::Http);
//!
//! let values = TagValues {
//!     title: "Live".to_string(),
//!     ..TagValues::default()
//! };
//! let changed = track.apply_tags(TagMask::TITLE, &values);
//! assert!(changed.contains(TagMask::TITLE));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{RenaError, Result};
pub use traits::{
    Favorites, NoProgress, PlaylistStorage, Progress, ProviderHooks, TagEditor,
    SAVE_PLAYLIST_STATE,
};
pub use types::{SourceKind, TagMask, TagValues, Track, TrackBuilder};
