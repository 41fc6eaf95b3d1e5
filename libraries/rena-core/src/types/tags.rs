//! Tag change bitmask and replacement values

use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Set of tag fields, used both for "which fields to write" and
/// "which fields changed"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMask(u32);

impl TagMask {
    /// No fields
    pub const NONE: TagMask = TagMask(0);
    /// Track title
    pub const TITLE: TagMask = TagMask(1 << 0);
    /// Track artist
    pub const ARTIST: TagMask = TagMask(1 << 1);
    /// Album name
    pub const ALBUM: TagMask = TagMask(1 << 2);
    /// Genre
    pub const GENRE: TagMask = TagMask(1 << 3);
    /// Release year
    pub const YEAR: TagMask = TagMask(1 << 4);
    /// Track number
    pub const TRACK_NO: TagMask = TagMask(1 << 5);
    /// Free-form comment
    pub const COMMENT: TagMask = TagMask(1 << 6);
    /// Every editable field
    pub const ALL: TagMask = TagMask(0x7f);

    /// Raw bit representation
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Build from raw bits, dropping unknown bits
    pub fn from_bits_truncate(bits: u32) -> Self {
        TagMask(bits & Self::ALL.0)
    }

    /// True when every bit of `other` is set in `self`
    pub fn contains(self, other: TagMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when at least one bit of `other` is set in `self`
    pub fn intersects(self, other: TagMask) -> bool {
        self.0 & other.0 != 0
    }

    /// True when no field is selected
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for TagMask {
    type Output = TagMask;

    fn bitor(self, rhs: TagMask) -> TagMask {
        TagMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for TagMask {
    fn bitor_assign(&mut self, rhs: TagMask) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TagMask {
    type Output = TagMask;

    fn bitand(self, rhs: TagMask) -> TagMask {
        TagMask(self.0 & rhs.0)
    }
}

/// Replacement values for a tag edit
///
/// Only the fields selected by the accompanying [`TagMask`] are read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagValues {
    /// New title
    pub title: String,
    /// New artist
    pub artist: String,
    /// New album
    pub album: String,
    /// New genre
    pub genre: String,
    /// New comment
    pub comment: String,
    /// New year (0 = unset)
    pub year: u32,
    /// New track number (0 = unset)
    pub track_no: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_operations() {
        let mask = TagMask::TITLE | TagMask::ARTIST;
        assert!(mask.contains(TagMask::TITLE));
        assert!(!mask.contains(TagMask::TITLE | TagMask::YEAR));
        assert!(mask.intersects(TagMask::ARTIST | TagMask::YEAR));
        assert!(TagMask::NONE.is_empty());
        assert_eq!((mask & TagMask::ARTIST), TagMask::ARTIST);
    }

    #[test]
    fn unknown_bits_are_dropped() {
        let mask = TagMask::from_bits_truncate(0xffff);
        assert_eq!(mask, TagMask::ALL);
    }
}
