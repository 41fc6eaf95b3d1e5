//! Source kinds: where a track's bytes come from

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a track's origin
///
/// Decides how the engine resolves a playable URI. `Provider` codes are
/// assigned by remote-library plugins; the engine never interprets them and
/// always asks the provider hook for a session URL instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// File on the local filesystem
    Local,

    /// Plain HTTP(S) stream, played as-is
    Http,

    /// Plugin-assigned remote provider
    Provider(u16),
}

impl SourceKind {
    /// Whether playback of this source goes over the network
    pub fn is_network(self) -> bool {
        !matches!(self, SourceKind::Local)
    }

    /// Whether a provider has to resolve the URI before playback
    pub fn needs_prepare(self) -> bool {
        matches!(self, SourceKind::Provider(_))
    }

    /// Guess the kind from a location string
    ///
    /// Anything with an `http`/`https` scheme is `Http`; everything else is
    /// treated as a local path.
    pub fn from_location(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceKind::Http
        } else {
            SourceKind::Local
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Local => f.write_str("local"),
            SourceKind::Http => f.write_str("http"),
            SourceKind::Provider(code) => write!(f, "provider:{code}"),
        }
    }
}
