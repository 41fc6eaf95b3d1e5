//! File-backed playlist storage
//!
//! Keeps saved playlists in `playlists.json` and the session marker in
//! `state.json` under the configured data directory. Rows are stored whole;
//! on lookup, local rows are re-read from the filesystem while remote rows
//! are left to the saved copy.

use rena_core::{PlaylistStorage, RenaError, Result, Track};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PLAYLISTS_FILE: &str = "playlists.json";
const STATE_FILE: &str = "state.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionState {
    current: Option<String>,
}

/// [`PlaylistStorage`] writing JSON files into a directory
#[derive(Debug)]
pub struct JsonPlaylistStorage {
    dir: PathBuf,
    playlists: BTreeMap<String, Vec<Track>>,
    state: SessionState,
}

impl JsonPlaylistStorage {
    /// Open (creating if needed) the storage directory `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let playlists = read_json(&dir.join(PLAYLISTS_FILE))?.unwrap_or_default();
        let state = read_json(&dir.join(STATE_FILE))?.unwrap_or_default();

        debug!(dir = %dir.display(), "Opened playlist storage");
        Ok(Self {
            dir,
            playlists,
            state,
        })
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of all saved playlists
    pub fn playlist_names(&self) -> impl Iterator<Item = &str> {
        self.playlists.keys().map(String::as_str)
    }

    fn write_playlists(&self) -> Result<()> {
        write_json(&self.dir.join(PLAYLISTS_FILE), &self.playlists)
    }

    fn write_state(&self) -> Result<()> {
        write_json(&self.dir.join(STATE_FILE), &self.state)
    }
}

impl PlaylistStorage for JsonPlaylistStorage {
    fn save_playlist(&mut self, name: &str, rows: &[Track]) -> Result<()> {
        self.playlists.insert(name.to_string(), rows.to_vec());
        self.write_playlists()
    }

    fn load_playlist(&self, name: &str) -> Result<Vec<Track>> {
        Ok(self.playlists.get(name).cloned().unwrap_or_default())
    }

    fn lookup_track(&self, file: &str) -> Result<Option<Track>> {
        // No library index for remote rows
        if file.contains("://") {
            return Ok(None);
        }

        let path = Path::new(file);
        if !path.is_file() {
            warn!(%file, "Playlist entry no longer exists on disk");
            return Ok(None);
        }
        Track::from_local_path(path).map(Some)
    }

    fn save_current_token(&mut self, token: Option<&str>) -> Result<()> {
        self.state.current = token.map(str::to_string);
        self.write_state()
    }

    fn load_current_token(&self) -> Result<Option<String>> {
        Ok(self.state.current.clone())
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    let value = serde_json::from_str(&contents)
        .map_err(|e| RenaError::storage(format!("{}: {e}", path.display())))?;
    Ok(Some(value))
}

/// Replace `path` atomically (temp file + rename)
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
