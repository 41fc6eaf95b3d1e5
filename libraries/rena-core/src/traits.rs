/// Collaborator traits
///
/// The engine, sequencer and controller never look up shared services
/// globally; hosts hand in implementations of these traits instead.
use crate::error::Result;
use crate::types::{TagMask, TagValues, Track};
use std::ops::ControlFlow;

/// Reserved playlist name under which the current playlist is persisted
pub const SAVE_PLAYLIST_STATE: &str = "con_playlist";

/// Storage collaborator
///
/// Persists the current playlist as a flat, ordered list of rows and the
/// "current row" marker as an opaque token.
pub trait PlaylistStorage {
    /// Replace the playlist `name` with `rows`, keeping their order
    ///
    /// Rows are stored whole so remote entries keep their source kind,
    /// provider and metadata.
    fn save_playlist(&mut self, name: &str, rows: &[Track]) -> Result<()>;

    /// Ordered rows of playlist `name` (empty when unknown)
    fn load_playlist(&self, name: &str) -> Result<Vec<Track>>;

    /// Resolve a file reference back to a track
    ///
    /// Implementations return `Ok(None)` for references they no longer know;
    /// those rows are skipped on restore.
    fn lookup_track(&self, file: &str) -> Result<Option<Track>>;

    /// Persist the "current row" token (`None` clears it)
    fn save_current_token(&mut self, token: Option<&str>) -> Result<()>;

    /// Previously persisted "current row" token
    fn load_current_token(&self) -> Result<Option<String>>;
}

/// Remote provider collaborator
///
/// Only consulted for `SourceKind::Provider` tracks.
pub trait ProviderHooks {
    /// Resolve a playable (usually session-authenticated) URI for `track`
    fn prepare_source(&mut self, track: &Track) -> Result<String>;

    /// Local caching of `track` finished; the fully buffered copy is at `path`
    fn download_done(&mut self, track: &Track, path: &str) -> Result<()> {
        let _ = (track, path);
        Ok(())
    }

    /// Playback of the prepared source ended; release session resources
    fn clean_source(&mut self) {}
}

/// Tag writer collaborator
pub trait TagEditor {
    /// Write the masked fields of `values` into every file in `files`
    ///
    /// Returns the number of files written. Implementations report progress
    /// after each file and stop early when `progress` asks to.
    fn apply(
        &mut self,
        files: &[String],
        mask: TagMask,
        values: &TagValues,
        progress: &mut dyn Progress,
    ) -> Result<usize>;
}

/// Favorites collaborator
pub trait Favorites {
    /// Whether `file` is marked as favorite
    fn is_favorite(&self, file: &str) -> bool;

    /// Flip the favorite mark of `track`, returning the new state
    fn toggle(&mut self, track: &Track) -> Result<bool>;
}

/// Progress / cancellation callback for long-running loops
///
/// Replaces pumping the UI event loop from inside bulk operations.
pub trait Progress {
    /// `done` of `total` items processed; `Break` cancels the operation
    fn report(&mut self, done: usize, total: usize) -> ControlFlow<()>;
}

impl<F> Progress for F
where
    F: FnMut(usize, usize) -> ControlFlow<()>,
{
    fn report(&mut self, done: usize, total: usize) -> ControlFlow<()> {
        self(done, total)
    }
}

/// Progress sink that never cancels
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _done: usize, _total: usize) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}
