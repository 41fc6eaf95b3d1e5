//! What plays next
//!
//! Navigation rules, in priority order:
//! - Manual queue: always consumed first by `get_next` / `get_any`
//! - Shuffle: replays recorded history forward, otherwise draws a random
//!   unplayed row (any row once all are played and repeat is on)
//! - Sequential: display order, wrapping to the first row with repeat
//!
//! `get_prev` never consults the queue.

use crate::arena::{Arena, Handle};
use crate::error::{PlaylistError, Result};
use crate::types::{Entry, RowState, SequencerConfig};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rena_core::Track;
use tracing::{debug, trace};

/// Ordered playlist plus its navigation state
#[derive(Debug)]
pub struct Sequencer {
    pub(crate) entries: Arena<Entry>,
    pub(crate) order: Vec<Handle>,
    pub(crate) unplayed: usize,

    /// Current row while shuffle is off
    pub(crate) cursor: Option<Handle>,
    /// Random order actually produced, plus the position of "current" in it
    pub(crate) history: Vec<Handle>,
    pub(crate) history_cursor: Option<usize>,
    /// The current shuffled row was removed; `history_cursor` then marks the
    /// slot just before the gap
    pub(crate) history_detached: bool,
    /// Rows the user asked to hear next
    pub(crate) queue: Vec<Handle>,
    pub(crate) selection: Vec<Handle>,

    pub(crate) shuffle: bool,
    pub(crate) repeat: bool,
    rng: StdRng,
}

impl Sequencer {
    /// Create an empty sequencer seeded from OS entropy
    pub fn new(config: SequencerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create an empty sequencer drawing shuffle picks from `rng`
    pub fn with_rng(config: SequencerConfig, rng: StdRng) -> Self {
        Self {
            entries: Arena::new(),
            order: Vec::new(),
            unplayed: 0,
            cursor: None,
            history: Vec::new(),
            history_cursor: None,
            history_detached: false,
            queue: Vec::new(),
            selection: Vec::new(),
            shuffle: config.shuffle,
            repeat: config.repeat,
            rng,
        }
    }

    // ===== Collection =====

    /// Add a row at the end
    pub fn append(&mut self, track: Track) -> Handle {
        let handle = self.entries.insert(Entry::new(track));
        self.order.push(handle);
        self.unplayed += 1;
        handle
    }

    /// Add rows at the end, keeping their order
    pub fn append_many(&mut self, tracks: impl IntoIterator<Item = Track>) -> Vec<Handle> {
        let handles: Vec<Handle> = tracks.into_iter().map(|t| self.append(t)).collect();
        debug!(count = handles.len(), "Appended rows");
        handles
    }

    /// Insert a row before `position` (`len()` appends)
    pub fn insert_at(&mut self, position: usize, track: Track) -> Result<Handle> {
        if position > self.order.len() {
            return Err(PlaylistError::PositionOutOfRange {
                position,
                len: self.order.len(),
            });
        }

        let handle = self.entries.insert(Entry::new(track));
        self.order.insert(position, handle);
        self.unplayed += 1;
        Ok(handle)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the playlist has no rows
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Rows in display order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Entry)> + '_ {
        self.order
            .iter()
            .filter_map(|h| self.entries.get(*h).map(|entry| (*h, entry)))
    }

    /// Row behind `handle`, `None` once removed
    pub fn get(&self, handle: Handle) -> Option<&Entry> {
        self.entries.get(handle)
    }

    /// Track of the row behind `handle`
    pub fn track(&self, handle: Handle) -> Option<&Track> {
        self.entries.get(handle).map(Entry::track)
    }

    /// Handle of the row at display `position`
    pub fn handle_at(&self, position: usize) -> Option<Handle> {
        self.order.get(position).copied()
    }

    /// Display position of `handle`
    pub fn position_of(&self, handle: Handle) -> Option<usize> {
        self.order.iter().position(|h| *h == handle)
    }

    /// Number of rows not handed out since the last reset
    pub fn unplayed_count(&self) -> usize {
        self.unplayed
    }

    /// Whether the row was handed out since the last reset
    pub fn is_played(&self, handle: Handle) -> bool {
        self.entries.get(handle).is_some_and(|entry| entry.played)
    }

    // ===== Modes =====

    /// Whether shuffle is on
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Whether repeat is on
    pub fn repeat(&self) -> bool {
        self.repeat
    }

    /// Enable or disable repeat
    pub fn set_repeat(&mut self, repeat: bool) {
        debug!(repeat, "Repeat toggled");
        self.repeat = repeat;
    }

    /// Switch shuffle on or off without losing place
    ///
    /// Turning shuffle on seeds the history with the current sequential row.
    /// Turning it off makes the last shuffled row the sequential cursor and
    /// marks every row unplayed again, as if the sequential run started from
    /// there.
    pub fn on_shuffle_toggled(&mut self, shuffle: bool) {
        if shuffle == self.shuffle {
            return;
        }
        debug!(shuffle, "Shuffle toggled");

        self.history_detached = false;
        if shuffle {
            self.history.clear();
            self.history_cursor = None;
            if let Some(current) = self.cursor {
                self.history.push(current);
                self.history_cursor = Some(0);
            }
        } else {
            self.cursor = self.shuffle_current();
            self.history.clear();
            self.history_cursor = None;
            self.reset_played();
        }

        self.shuffle = shuffle;
        self.debug_check();
    }

    /// Forget the whole navigation state after playback fully stopped
    pub fn on_playback_stopped(&mut self) {
        debug!("Resetting navigation state");

        self.cursor = None;
        self.history.clear();
        self.history_cursor = None;
        self.history_detached = false;
        self.clear_queue();
        self.reset_played();

        for entry in self.entries.values_mut() {
            if matches!(entry.row_state, RowState::Playing | RowState::Paused) {
                entry.row_state = RowState::None;
            }
        }

        self.debug_check();
    }

    // ===== Navigation =====

    /// The row last handed out
    pub fn current(&self) -> Option<Handle> {
        if self.shuffle {
            self.shuffle_current()
        } else {
            self.cursor.filter(|h| self.entries.contains(*h))
        }
    }

    /// Next row to play, `None` at the end of the playlist
    pub fn get_next(&mut self) -> Option<Handle> {
        if let Some(handle) = self.pop_queue() {
            return Some(handle);
        }

        let next = if self.shuffle {
            self.next_shuffled()
        } else {
            self.next_sequential()
        };

        if let Some(handle) = next {
            self.mark_played(handle);
        }
        trace!(?next, "get_next");
        self.debug_check();
        next
    }

    /// Previous row, `None` at the start of the playlist
    pub fn get_prev(&mut self) -> Option<Handle> {
        let prev = if self.shuffle {
            self.prev_shuffled()
        } else {
            self.prev_sequential()
        };

        if let Some(handle) = prev {
            self.mark_played(handle);
        }
        trace!(?prev, "get_prev");
        self.debug_check();
        prev
    }

    /// Row to start playback with from a stopped state
    ///
    /// Queue head, else the first selected row, else a random row (shuffle)
    /// or the first row.
    pub fn get_any(&mut self) -> Option<Handle> {
        if let Some(handle) = self.pop_queue() {
            return Some(handle);
        }

        let selected = self
            .selection
            .iter()
            .copied()
            .find(|h| self.entries.contains(*h));

        let any = match selected {
            Some(handle) => Some(handle),
            None if self.shuffle => self.draw(false).or_else(|| self.draw(true)),
            None => self.order.first().copied(),
        };

        if let Some(handle) = any {
            self.take(handle);
        }
        trace!(?any, "get_any");
        self.debug_check();
        any
    }

    /// Make `handle` the current row, e.g. after the user activated it
    ///
    /// Counts as new ground: recorded in the shuffle history and marked
    /// played. A queued row is taken out of the queue.
    pub fn jump_to(&mut self, handle: Handle) -> Result<()> {
        if !self.entries.contains(handle) {
            return Err(PlaylistError::StaleHandle(handle));
        }

        if self.queue.contains(&handle) {
            self.queue.retain(|h| *h != handle);
            self.renumber_queue();
        }
        if self.shuffle {
            retain_history(&mut self.history, &mut self.history_cursor, |h| h != handle);
        }

        self.take(handle);
        self.debug_check();
        Ok(())
    }

    fn pop_queue(&mut self) -> Option<Handle> {
        if self.queue.is_empty() {
            return None;
        }

        let handle = self.queue.remove(0);
        self.renumber_queue();
        if let Some(entry) = self.entries.get_mut(handle) {
            entry.queue_label = None;
        }

        if self.shuffle {
            // A queued row plays once in the recorded order, at the cursor
            retain_history(&mut self.history, &mut self.history_cursor, |h| h != handle);
        }

        debug!(?handle, "Playing queued row");
        self.take(handle);
        self.debug_check();
        Some(handle)
    }

    fn next_sequential(&mut self) -> Option<Handle> {
        let next = match self.cursor.and_then(|h| self.position_of(h)) {
            None => self.order.first().copied(),
            Some(position) => match self.order.get(position + 1) {
                Some(handle) => Some(*handle),
                None if self.repeat => self.order.first().copied(),
                None => None,
            },
        };

        if next.is_some() {
            self.cursor = next;
        }
        next
    }

    fn prev_sequential(&mut self) -> Option<Handle> {
        let position = self.cursor.and_then(|h| self.position_of(h))?;

        let prev = match position.checked_sub(1) {
            Some(previous) => self.order.get(previous).copied(),
            None if self.repeat => self.order.last().copied(),
            None => None,
        };

        if prev.is_some() {
            self.cursor = prev;
        }
        prev
    }

    fn next_shuffled(&mut self) -> Option<Handle> {
        // Redo a path the user already walked back through
        let slot = self.history_cursor.map_or(0, |cursor| cursor + 1);
        if let Some(handle) = self.history.get(slot).copied() {
            self.history_cursor = Some(slot);
            self.history_detached = false;
            return Some(handle);
        }

        let drawn = match self.draw(false) {
            Some(handle) => Some(handle),
            None if self.repeat => self.draw(true),
            None => None,
        };

        if let Some(handle) = drawn {
            self.record(handle);
        }
        drawn
    }

    fn prev_shuffled(&mut self) -> Option<Handle> {
        if self.history_detached {
            // The slot before the removed row is the previous one
            self.history_detached = false;
            if let Some(cursor) = self.history_cursor {
                return self.history.get(cursor).copied();
            }
        }

        match self.history_cursor {
            Some(cursor) if cursor > 0 => {
                self.history_cursor = Some(cursor - 1);
                self.history.get(cursor - 1).copied()
            }
            _ if self.repeat => {
                let last = self.order.last().copied()?;
                self.history.insert(0, last);
                self.history_cursor = Some(0);
                Some(last)
            }
            _ => None,
        }
    }

    /// Uniform pick over unplayed rows, or over all rows when `any`
    ///
    /// Picking from all rows avoids the current one unless it is the only row.
    fn draw(&mut self, any: bool) -> Option<Handle> {
        let current = self.current();
        let mut candidates: Vec<Handle> = self
            .iter()
            .filter(|(_, entry)| any || !entry.played)
            .map(|(handle, _)| handle)
            .collect();

        if any && candidates.len() > 1 {
            candidates.retain(|h| Some(*h) != current);
        }

        candidates.choose(&mut self.rng).copied()
    }

    /// Hand out `handle` as new ground
    fn take(&mut self, handle: Handle) {
        if self.shuffle {
            self.record(handle);
        } else {
            self.cursor = Some(handle);
        }
        self.mark_played(handle);
    }

    /// Record `handle` into the shuffle history right after the cursor
    fn record(&mut self, handle: Handle) {
        let at = self
            .history_cursor
            .map_or(0, |cursor| (cursor + 1).min(self.history.len()));
        self.history.insert(at, handle);
        self.history_cursor = Some(at);
        self.history_detached = false;
    }

    fn shuffle_current(&self) -> Option<Handle> {
        if self.history_detached {
            return None;
        }
        self.history_cursor
            .and_then(|cursor| self.history.get(cursor))
            .copied()
            .filter(|h| self.entries.contains(*h))
    }

    // ===== Played Marks =====

    pub(crate) fn mark_played(&mut self, handle: Handle) {
        if let Some(entry) = self.entries.get_mut(handle) {
            if !entry.played {
                entry.played = true;
                self.unplayed -= 1;
            }
        }
    }

    pub(crate) fn reset_played(&mut self) {
        for entry in self.entries.values_mut() {
            entry.played = false;
        }
        self.unplayed = self.entries.len();
    }

    pub(crate) fn debug_check(&self) {
        debug_assert_eq!(
            self.unplayed,
            self.entries.values().filter(|entry| !entry.played).count(),
            "unplayed count out of sync"
        );
        debug_assert_eq!(self.order.len(), self.entries.len(), "order out of sync");
        debug_assert!(
            self.queue.iter().all(|h| self.entries.contains(*h)),
            "stale handle in queue"
        );
        debug_assert!(
            self.history.iter().all(|h| self.entries.contains(*h)),
            "stale handle in shuffle history"
        );
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(SequencerConfig::default())
    }
}

/// Keep only history slots passing `keep`, tracking the cursor
///
/// Returns whether the slot under the cursor was dropped; the cursor then
/// moves to the closest earlier slot.
pub(crate) fn retain_history(
    history: &mut Vec<Handle>,
    cursor: &mut Option<usize>,
    mut keep: impl FnMut(Handle) -> bool,
) -> bool {
    let old_cursor = *cursor;
    let mut new_cursor = None;
    let mut cursor_dropped = false;
    let mut kept = Vec::with_capacity(history.len());

    for (index, handle) in history.drain(..).enumerate() {
        let under_cursor = old_cursor == Some(index);
        if keep(handle) {
            if under_cursor {
                new_cursor = Some(kept.len());
            }
            kept.push(handle);
        } else if under_cursor {
            cursor_dropped = true;
            new_cursor = kept.len().checked_sub(1);
        }
    }

    *history = kept;
    *cursor = new_cursor;
    cursor_dropped
}
