/// Track domain type
use crate::error::{RenaError, Result};
use crate::types::{SourceKind, TagMask, TagValues};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// One playable item and its metadata
///
/// The file reference is fixed at construction and never empty. Everything
/// else is plain metadata that tag edits and stream tags may rewrite. Cloning
/// is a deep copy; the engine relies on that to hold its own copy while the
/// playlist keeps mutating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    file: String,
    source: SourceKind,
    provider: Option<String>,

    /// Track title
    pub title: String,
    /// Artist name
    pub artist: String,
    /// Album name
    pub album: String,
    /// Genre
    pub genre: String,
    /// Free-form comment
    pub comment: String,
    /// Release year (0 = unknown)
    pub year: u32,
    /// Track number in album (0 = unknown)
    pub track_no: u32,
    /// Length in seconds
    pub length: u32,
    /// Bitrate in kbit/s
    pub bitrate: u32,
    /// Channel count
    pub channels: u32,
    /// Sample rate in Hz
    pub samplerate: u32,
}

impl Track {
    /// Start building a track for `file` with the given source kind
    pub fn builder(file: impl Into<String>, source: SourceKind) -> TrackBuilder {
        TrackBuilder {
            file: file.into(),
            source,
            provider: None,
            tags: TagValues::default(),
            length: 0,
            bitrate: 0,
            channels: 0,
            samplerate: 0,
        }
    }

    /// Track for a file on the local filesystem
    ///
    /// The title falls back to the file stem so rows are never blank.
    pub fn from_local_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = path.to_string_lossy().into_owned();
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self::builder(file, SourceKind::Local).title(title).build()
    }

    /// Track for a URL
    ///
    /// `http`/`https` URLs become `Http` tracks played as-is; `file` URLs are
    /// converted back to local paths.
    pub fn from_url(location: &str) -> Result<Self> {
        let url = Url::parse(location)
            .map_err(|e| RenaError::InvalidLocation(format!("{location}: {e}")))?;

        match url.scheme() {
            "http" | "https" => Self::builder(location, SourceKind::Http)
                .title(location)
                .build(),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| RenaError::InvalidLocation(location.to_string()))?;
                Self::from_local_path(path)
            }
            other => Err(RenaError::InvalidLocation(format!(
                "unsupported scheme '{other}' in {location}"
            ))),
        }
    }

    /// Track served by a remote provider plugin
    pub fn from_provider(
        file: impl Into<String>,
        code: u16,
        provider: impl Into<String>,
    ) -> Result<Self> {
        Self::builder(file, SourceKind::Provider(code))
            .provider(provider)
            .build()
    }

    /// File reference (path, URL or provider-specific id)
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Where the bytes come from
    pub fn source(&self) -> SourceKind {
        self.source
    }

    /// Remote service / library root this track belongs to
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Playable URI for sources that need no provider round-trip
    ///
    /// Local paths become `file://` URIs, HTTP locations are returned as-is.
    /// Provider tracks return `None`; their URI comes from the provider hook.
    pub fn direct_uri(&self) -> Result<Option<String>> {
        match self.source {
            SourceKind::Local => {
                if self.file.starts_with("file://") {
                    return Ok(Some(self.file.clone()));
                }
                let uri = Url::from_file_path(&self.file)
                    .map_err(|()| RenaError::InvalidLocation(self.file.clone()))?;
                Ok(Some(uri.into()))
            }
            SourceKind::Http => Ok(Some(self.file.clone())),
            SourceKind::Provider(_) => Ok(None),
        }
    }

    /// Copy the masked fields of `values` into this track
    ///
    /// Returns the subset of `mask` whose value actually changed.
    pub fn apply_tags(&mut self, mask: TagMask, values: &TagValues) -> TagMask {
        let mut changed = TagMask::NONE;

        fn set_text(field: &mut String, value: &str, bit: TagMask, changed: &mut TagMask) {
            if field != value {
                value.clone_into(field);
                *changed |= bit;
            }
        }

        fn set_number(field: &mut u32, value: u32, bit: TagMask, changed: &mut TagMask) {
            if *field != value {
                *field = value;
                *changed |= bit;
            }
        }

        if mask.contains(TagMask::TITLE) {
            set_text(&mut self.title, &values.title, TagMask::TITLE, &mut changed);
        }
        if mask.contains(TagMask::ARTIST) {
            set_text(&mut self.artist, &values.artist, TagMask::ARTIST, &mut changed);
        }
        if mask.contains(TagMask::ALBUM) {
            set_text(&mut self.album, &values.album, TagMask::ALBUM, &mut changed);
        }
        if mask.contains(TagMask::GENRE) {
            set_text(&mut self.genre, &values.genre, TagMask::GENRE, &mut changed);
        }
        if mask.contains(TagMask::COMMENT) {
            set_text(&mut self.comment, &values.comment, TagMask::COMMENT, &mut changed);
        }
        if mask.contains(TagMask::YEAR) {
            set_number(&mut self.year, values.year, TagMask::YEAR, &mut changed);
        }
        if mask.contains(TagMask::TRACK_NO) {
            set_number(&mut self.track_no, values.track_no, TagMask::TRACK_NO, &mut changed);
        }

        changed
    }

    /// Snapshot of the editable fields
    pub fn tag_values(&self) -> TagValues {
        TagValues {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            genre: self.genre.clone(),
            comment: self.comment.clone(),
            year: self.year,
            track_no: self.track_no,
        }
    }
}

/// Builder for [`Track`]
#[derive(Debug, Clone)]
pub struct TrackBuilder {
    file: String,
    source: SourceKind,
    provider: Option<String>,
    tags: TagValues,
    length: u32,
    bitrate: u32,
    channels: u32,
    samplerate: u32,
}

impl TrackBuilder {
    /// Provider / library root identifier
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Track title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.tags.title = title.into();
        self
    }

    /// Artist name
    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.tags.artist = artist.into();
        self
    }

    /// Album name
    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.tags.album = album.into();
        self
    }

    /// Genre
    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.tags.genre = genre.into();
        self
    }

    /// Comment
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.tags.comment = comment.into();
        self
    }

    /// Release year
    pub fn year(mut self, year: u32) -> Self {
        self.tags.year = year;
        self
    }

    /// Track number
    pub fn track_no(mut self, track_no: u32) -> Self {
        self.tags.track_no = track_no;
        self
    }

    /// Length in seconds
    pub fn length(mut self, seconds: u32) -> Self {
        self.length = seconds;
        self
    }

    /// Stream properties: bitrate (kbit/s), channels, sample rate (Hz)
    pub fn audio_properties(mut self, bitrate: u32, channels: u32, samplerate: u32) -> Self {
        self.bitrate = bitrate;
        self.channels = channels;
        self.samplerate = samplerate;
        self
    }

    /// Finish the track, rejecting an empty file reference
    pub fn build(self) -> Result<Track> {
        if self.file.trim().is_empty() {
            return Err(RenaError::EmptyFile);
        }

        Ok(Track {
            file: self.file,
            source: self.source,
            provider: self.provider,
            title: self.tags.title,
            artist: self.tags.artist,
            album: self.tags.album,
            genre: self.tags.genre,
            comment: self.tags.comment,
            year: self.tags.year,
            track_no: self.tags.track_no,
            length: self.length,
            bitrate: self.bitrate,
            channels: self.channels,
            samplerate: self.samplerate,
        })
    }
}
