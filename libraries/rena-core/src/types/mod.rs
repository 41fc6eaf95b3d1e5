mod source;
mod tags;
mod track;

pub use source::SourceKind;
pub use tags::{TagMask, TagValues};
pub use track::{Track, TrackBuilder};
