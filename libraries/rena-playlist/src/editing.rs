//! Playlist edits: removal, selection, manual queue, reordering, row icons
//! and tag propagation
//!
//! Every removal path funnels into [`Sequencer::remove_handles`], which
//! purges removed rows from the cursor, the shuffle history and the queue in
//! one place.

use crate::arena::Handle;
use crate::error::{PlaylistError, Result};
use crate::sequencer::{retain_history, Sequencer};
use crate::types::{RowState, TagChange};
use rena_core::{SourceKind, TagMask, TagValues, Track};
use std::collections::HashSet;
use tracing::debug;

impl Sequencer {
    // ===== Removal =====

    /// Remove one row, returning its track
    pub fn remove(&mut self, handle: Handle) -> Option<Track> {
        self.remove_handles([handle]).pop()
    }

    /// Remove the selected rows
    pub fn remove_selection(&mut self) -> Vec<Track> {
        let selected = std::mem::take(&mut self.selection);
        self.remove_handles(selected)
    }

    /// Keep only the selected rows
    pub fn crop_to_selection(&mut self) -> Vec<Track> {
        let keep: HashSet<Handle> = self.selection.iter().copied().collect();
        let doomed: Vec<Handle> = self
            .order
            .iter()
            .copied()
            .filter(|h| !keep.contains(h))
            .collect();
        self.remove_handles(doomed)
    }

    /// Remove every row whose track comes from `source`
    ///
    /// Used when a provider goes away.
    pub fn remove_by_source_kind(&mut self, source: SourceKind) -> Vec<Track> {
        let doomed: Vec<Handle> = self
            .iter()
            .filter(|(_, entry)| entry.track.source() == source)
            .map(|(handle, _)| handle)
            .collect();
        self.remove_handles(doomed)
    }

    /// Remove every row and reset all navigation state
    pub fn clear_all(&mut self) {
        debug!(rows = self.order.len(), "Clearing playlist");

        self.entries.clear();
        self.order.clear();
        self.unplayed = 0;
        self.cursor = None;
        self.history.clear();
        self.history_cursor = None;
        self.history_detached = false;
        self.queue.clear();
        self.selection.clear();
        self.debug_check();
    }

    /// Remove rows and repair everything that referenced them
    ///
    /// Stale or duplicate handles are ignored. Returns the removed tracks in
    /// the order given.
    pub(crate) fn remove_handles(&mut self, handles: impl IntoIterator<Item = Handle>) -> Vec<Track> {
        let mut removed = Vec::new();
        for handle in handles {
            if let Some(entry) = self.entries.remove(handle) {
                if !entry.played {
                    self.unplayed -= 1;
                }
                removed.push(entry.track);
            }
        }

        if !removed.is_empty() {
            debug!(count = removed.len(), "Removed rows");
            self.prune_removed();
        }
        removed
    }

    /// Drop handles whose rows are gone from every auxiliary structure
    fn prune_removed(&mut self) {
        let entries = &self.entries;

        self.order.retain(|h| entries.contains(*h));
        self.selection.retain(|h| entries.contains(*h));

        if self.cursor.is_some_and(|h| !entries.contains(h)) {
            self.cursor = None;
        }

        // Keep the place in the history even when the current row goes
        let dropped = retain_history(&mut self.history, &mut self.history_cursor, |h| {
            entries.contains(h)
        });
        self.history_detached |= dropped;

        let queue_before = self.queue.len();
        self.queue.retain(|h| entries.contains(*h));
        if self.queue.len() != queue_before {
            self.renumber_queue();
        }

        self.debug_check();
    }

    // ===== Selection =====

    /// Replace the selection (stale handles are dropped)
    pub fn select(&mut self, handles: &[Handle]) {
        self.selection = handles
            .iter()
            .copied()
            .filter(|h| self.entries.contains(*h))
            .collect();
    }

    /// Selected rows, in selection order
    pub fn selection(&self) -> &[Handle] {
        &self.selection
    }

    /// Deselect everything
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ===== Manual Queue =====

    /// Queue unqueued rows and dequeue queued ones
    pub fn toggle_queue(&mut self, handles: &[Handle]) {
        for handle in handles {
            if self.queue.contains(handle) {
                self.queue.retain(|h| h != handle);
            } else if self.entries.contains(*handle) {
                self.queue.push(*handle);
            }
        }
        self.renumber_queue();
    }

    /// Queue a row at the end of the manual queue
    ///
    /// Returns `Ok(false)` when it was already queued.
    pub fn enqueue(&mut self, handle: Handle) -> Result<bool> {
        if !self.entries.contains(handle) {
            return Err(PlaylistError::StaleHandle(handle));
        }
        if self.queue.contains(&handle) {
            return Ok(false);
        }

        self.queue.push(handle);
        self.renumber_queue();
        Ok(true)
    }

    /// Take a row out of the manual queue, returning whether it was queued
    pub fn dequeue(&mut self, handle: Handle) -> bool {
        let before = self.queue.len();
        self.queue.retain(|h| *h != handle);
        if self.queue.len() == before {
            return false;
        }

        if let Some(entry) = self.entries.get_mut(handle) {
            entry.queue_label = None;
        }
        self.renumber_queue();
        true
    }

    /// 1-based queue position of a row
    pub fn queue_label(&self, handle: Handle) -> Option<usize> {
        self.entries.get(handle).and_then(|entry| entry.queue_label)
    }

    /// Queued rows, next first
    pub fn queue(&self) -> &[Handle] {
        &self.queue
    }

    pub(crate) fn clear_queue(&mut self) {
        self.queue.clear();
        self.renumber_queue();
    }

    /// Rewrite the dense 1, 2, 3, ... labels after any queue change
    pub(crate) fn renumber_queue(&mut self) {
        for entry in self.entries.values_mut() {
            entry.queue_label = None;
        }
        for (position, handle) in self.queue.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(*handle) {
                entry.queue_label = Some(position + 1);
            }
        }
    }

    // ===== Reordering =====

    /// Move rows so the first lands at display position `to`
    ///
    /// `to` counts positions before the move; moved rows keep their relative
    /// order. Handles stay valid.
    pub fn move_rows(&mut self, handles: &[Handle], to: usize) -> Result<()> {
        if to > self.order.len() {
            return Err(PlaylistError::PositionOutOfRange {
                position: to,
                len: self.order.len(),
            });
        }
        if let Some(stale) = handles.iter().find(|h| !self.entries.contains(**h)) {
            return Err(PlaylistError::StaleHandle(*stale));
        }

        let moving: HashSet<Handle> = handles.iter().copied().collect();
        let insert_at = self.order[..to]
            .iter()
            .filter(|h| !moving.contains(h))
            .count();

        let moved: Vec<Handle> = self
            .order
            .iter()
            .copied()
            .filter(|h| moving.contains(h))
            .collect();
        self.order.retain(|h| !moving.contains(h));
        self.order.splice(insert_at..insert_at, moved);

        self.debug_check();
        Ok(())
    }

    // ===== Row Icons =====

    /// Set a row's icon
    ///
    /// Only one row shows Playing or Paused; setting either clears the other
    /// rows' playback icons.
    pub fn set_row_state(&mut self, handle: Handle, state: RowState) -> Result<()> {
        if !self.entries.contains(handle) {
            return Err(PlaylistError::StaleHandle(handle));
        }

        if matches!(state, RowState::Playing | RowState::Paused) {
            for entry in self.entries.values_mut() {
                if matches!(entry.row_state, RowState::Playing | RowState::Paused) {
                    entry.row_state = RowState::None;
                }
            }
        }

        if let Some(entry) = self.entries.get_mut(handle) {
            entry.row_state = state;
        }
        Ok(())
    }

    /// Mark a row as failed; `missing` marks the resource as not found
    pub fn mark_error(&mut self, handle: Handle, missing: bool) -> Result<()> {
        let state = if missing {
            RowState::Missing
        } else {
            RowState::Error
        };
        self.set_row_state(handle, state)
    }

    /// Icon of a row
    pub fn row_state(&self, handle: Handle) -> Option<RowState> {
        self.entries.get(handle).map(|entry| entry.row_state)
    }

    // ===== Tag Propagation =====

    /// Push an external tag edit into every row playing one of `files`
    ///
    /// The caller forwards the same edit to the engine when
    /// [`TagChange::touches_current`] is set, keeping its held copy in sync.
    pub fn apply_tag_change(
        &mut self,
        mask: TagMask,
        values: &TagValues,
        files: &[String],
    ) -> TagChange {
        let files: HashSet<&str> = files.iter().map(String::as_str).collect();
        let current = self.current();
        let mut change = TagChange::default();

        for handle in &self.order {
            let Some(entry) = self.entries.get_mut(*handle) else {
                continue;
            };
            if !files.contains(entry.track.file()) {
                continue;
            }
            if entry.track.apply_tags(mask, values).is_empty() {
                continue;
            }

            change.changed.push(*handle);
            if current == Some(*handle) {
                change.touches_current = true;
            }
        }

        debug!(
            rows = change.changed.len(),
            touches_current = change.touches_current,
            "Applied tag change"
        );
        change
    }

    /// Files of the given rows, skipping stale handles
    pub fn files_of(&self, handles: &[Handle]) -> Vec<String> {
        handles
            .iter()
            .filter_map(|h| self.track(*h))
            .map(|track| track.file().to_string())
            .collect()
    }
}
