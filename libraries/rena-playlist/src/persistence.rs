//! Saving and restoring the playlist through the storage collaborator

use crate::error::Result;
use crate::sequencer::Sequencer;
use crate::types::RestoreOutcome;
use rena_core::{
    PlaylistStorage, Progress, RenaError, SourceKind, Track, SAVE_PLAYLIST_STATE,
};
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

impl Sequencer {
    /// Persist rows and the current row token
    ///
    /// The token is the current row's display position.
    pub fn save(&self, storage: &mut dyn PlaylistStorage) -> Result<()> {
        let rows: Vec<Track> = self.iter().map(|(_, entry)| entry.track().clone()).collect();

        storage.save_playlist(SAVE_PLAYLIST_STATE, &rows)?;

        let token = self
            .current()
            .and_then(|handle| self.position_of(handle))
            .map(|position| position.to_string());
        storage.save_current_token(token.as_deref())?;

        info!(rows = rows.len(), current = ?token, "Saved playlist");
        Ok(())
    }

    /// Replace the playlist with the saved one
    ///
    /// Rows are resolved through storage first. Remote rows storage no
    /// longer knows are kept as saved; unknown local rows are skipped. The
    /// saved current row becomes the selection, so the next `get_any` starts
    /// there.
    ///
    /// Every row is resolved before the playlist is touched: a storage error,
    /// or cancelling through `progress` ([`RenaError::Cancelled`]), leaves
    /// the existing rows as they were.
    pub fn restore(
        &mut self,
        storage: &dyn PlaylistStorage,
        progress: &mut dyn Progress,
    ) -> Result<RestoreOutcome> {
        let saved = storage.load_playlist(SAVE_PLAYLIST_STATE)?;
        let total = saved.len();

        let mut resolved = Vec::with_capacity(total);
        for (done, row) in saved.into_iter().enumerate() {
            resolved.push(resolve(storage, row)?);

            if let ControlFlow::Break(()) = progress.report(done + 1, total) {
                debug!(done = done + 1, total, "Playlist restore cancelled");
                return Err(RenaError::Cancelled.into());
            }
        }
        let token = storage.load_current_token()?;

        self.clear_all();
        let mut outcome = RestoreOutcome::default();
        // Saved position -> restored row; skipped rows leave a hole
        let mut by_position = Vec::with_capacity(total);
        for track in resolved {
            if let Some(track) = track {
                by_position.push(Some(self.append(track)));
                outcome.restored += 1;
            } else {
                by_position.push(None);
                outcome.skipped += 1;
            }
        }

        outcome.current = token
            .and_then(|token| token.parse::<usize>().ok())
            .and_then(|position| by_position.get(position).copied().flatten());
        if let Some(current) = outcome.current {
            self.select(&[current]);
        }

        info!(
            restored = outcome.restored,
            skipped = outcome.skipped,
            "Restored playlist"
        );
        Ok(outcome)
    }
}

fn resolve(storage: &dyn PlaylistStorage, saved: Track) -> Result<Option<Track>> {
    if let Some(track) = storage.lookup_track(saved.file())? {
        return Ok(Some(track));
    }

    let usable = match saved.source() {
        SourceKind::Local => false,
        SourceKind::Http => Track::from_url(saved.file()).is_ok(),
        SourceKind::Provider(_) => !saved.file().is_empty(),
    };
    if !usable {
        warn!(
            file = %saved.file(),
            source = %saved.source(),
            "Saved playlist row no longer resolves, skipping"
        );
    }
    Ok(usable.then_some(saved))
}
