//! Bounded linear undo/redo history.
//!
//! The history is a sequence of buffer snapshots plus a cursor. Each
//! entry holds the buffer state *after* one edit; `base` holds the state
//! preceding the oldest retained entry, so every cursor position maps to
//! a concrete state:
//!
//! ```text
//! state at cursor 0 = base
//! state at cursor k = entries[k - 1].state     (1 <= k <= len)
//! ```
//!
//! Recording while the cursor is behind the end discards the redo tail
//! (standard linear-undo semantics). Exceeding the configured capacity
//! folds the oldest entry into `base`. The saved marker tracks the
//! cursor position at the last save; once that position is truncated or
//! evicted it becomes unreachable and the image stays "modified" until
//! the next save.
//!
//! Snapshots are `Arc`-shared with the live image, so an entry costs a
//! pointer, not a pixel copy, until an edit actually produces a new
//! buffer.

use std::sync::Arc;

use lumin_core::ImageBuffer;
use tracing::{debug, trace};

/// One recorded edit: the resulting buffer state and a display label.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    state: Arc<ImageBuffer>,
    label: String,
}

impl HistoryEntry {
    /// The buffer state this entry produced.
    pub fn state(&self) -> &Arc<ImageBuffer> {
        &self.state
    }

    /// The originating command's display name.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Bounded undo/redo stack of buffer snapshots.
#[derive(Debug)]
pub struct CommandHistory {
    base: Arc<ImageBuffer>,
    entries: Vec<HistoryEntry>,
    cursor: usize,
    saved: Option<usize>,
    capacity: usize,
}

impl CommandHistory {
    /// Creates a history rooted at `initial`, with the given maximum
    /// entry count (at least 1).
    pub fn new(initial: Arc<ImageBuffer>, capacity: usize) -> Self {
        Self {
            base: initial,
            entries: Vec::new(),
            cursor: 0,
            saved: Some(0),
            capacity: capacity.max(1),
        }
    }

    /// Appends the result of a new edit.
    ///
    /// Discards any redo tail beyond the cursor, advances the cursor,
    /// and evicts the oldest entry if the capacity is exceeded.
    pub fn record(&mut self, state: Arc<ImageBuffer>, label: impl Into<String>) {
        let label = label.into();
        trace!(%label, cursor = self.cursor, "recording edit");

        if self.cursor < self.entries.len() {
            debug!(
                discarded = self.entries.len() - self.cursor,
                "discarding redo tail"
            );
            self.entries.truncate(self.cursor);
            // A saved position inside the discarded tail is gone for good.
            if let Some(saved) = self.saved
                && saved > self.cursor
            {
                self.saved = None;
            }
        }

        self.entries.push(HistoryEntry { state, label });
        self.cursor += 1;

        if self.entries.len() > self.capacity {
            let evicted = self.entries.remove(0);
            debug!(label = %evicted.label, "evicting oldest history entry");
            self.base = evicted.state;
            self.cursor -= 1;
            self.saved = match self.saved {
                Some(0) | None => None,
                Some(s) => Some(s - 1),
            };
        }
    }

    /// Steps the cursor back one edit.
    ///
    /// Returns the buffer state that is now active, or `None` (with no
    /// state change) if there is nothing to undo.
    pub fn undo(&mut self) -> Option<Arc<ImageBuffer>> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.state_at(self.cursor))
    }

    /// Steps the cursor forward one edit.
    ///
    /// Returns the buffer state that is now active, or `None` (with no
    /// state change) if there is nothing to redo.
    pub fn redo(&mut self) -> Option<Arc<ImageBuffer>> {
        if self.cursor == self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.state_at(self.cursor))
    }

    /// Returns `true` if `undo` would succeed.
    #[inline]
    pub fn has_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Returns `true` if `redo` would succeed.
    #[inline]
    pub fn has_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Records the current cursor as the saved baseline.
    pub fn mark_saved(&mut self) {
        self.saved = Some(self.cursor);
    }

    /// Returns `true` if the current state differs from the saved one.
    ///
    /// Always `true` once the saved position has been evicted or
    /// truncated away.
    pub fn is_modified(&self) -> bool {
        self.saved != Some(self.cursor)
    }

    /// The buffer state at the current cursor.
    pub fn current_state(&self) -> Arc<ImageBuffer> {
        self.state_at(self.cursor)
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no edits are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current cursor position in [0, len].
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates over the retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    fn state_at(&self, cursor: usize) -> Arc<ImageBuffer> {
        if cursor == 0 {
            Arc::clone(&self.base)
        } else {
            Arc::clone(&self.entries[cursor - 1].state)
        }
    }
}
