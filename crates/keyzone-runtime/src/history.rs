#![forbid(unsafe_code)]

//! Snapshot-based undo/redo with grouped coalescing.
//!
//! Every loggable, state-changing command pushes the snapshot taken *before*
//! it ran. Undo swaps the current snapshot onto the future stack and
//! returns the stored one; redo is the mirror image.
//!
//! ```text
//! dispatch C1            past: [s0]                future: []
//! dispatch C2 (g)        past: [s0, s1·g]          future: []
//! dispatch C3 (g)        past: [s0, s1·g]          future: []   (coalesced)
//! undo                   past: [s0]                future: [s3·g]  -> s1
//! ```
//!
//! # Invariants
//!
//! 1. `past.len() <= depth` and `future.len() <= depth` after any operation.
//! 2. A push that is not coalesced clears the future.
//! 3. Consecutive pushes with the same non-empty group id produce one entry.
//! 4. Undo and redo break the group chain: a later push with the same group
//!    starts a new entry.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use keyzone_core::ZoneId;
use tracing::debug;

use crate::store::FocusState;

const TARGET: &str = "keyzone.history";

/// Everything undo restores: the application state, every zone's focus
/// state and the active zone.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<S> {
    /// Application state.
    pub app: S,
    /// Focus state per zone.
    pub stores: Vec<(ZoneId, FocusState)>,
    /// Zone holding jurisdiction.
    pub active: Option<ZoneId>,
}

/// One undo step.
pub struct HistoryEntry<T> {
    /// Command that produced the change.
    pub command: String,
    /// State to return to.
    pub snapshot: Arc<T>,
    /// Coalescing tag.
    pub group_id: Option<String>,
}

impl<T> Clone for HistoryEntry<T> {
    fn clone(&self) -> Self {
        Self {
            command: self.command.clone(),
            snapshot: Arc::clone(&self.snapshot),
            group_id: self.group_id.clone(),
        }
    }
}

impl<T> fmt::Debug for HistoryEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("command", &self.command)
            .field("group_id", &self.group_id)
            .finish_non_exhaustive()
    }
}

/// Bounded past/future stacks.
pub struct History<T> {
    past: VecDeque<HistoryEntry<T>>,
    future: VecDeque<HistoryEntry<T>>,
    depth: usize,
    open_group: Option<String>,
}

impl<T> fmt::Debug for History<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("past", &self.past.len())
            .field("future", &self.future.len())
            .field("depth", &self.depth)
            .field("open_group", &self.open_group)
            .finish()
    }
}

impl<T> History<T> {
    /// Create a history bounded at `depth` entries per stack.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            depth: depth.max(1),
            open_group: None,
        }
    }

    // ====================================================================
    // Core Operations
    // ====================================================================

    /// Record the state before `command` ran.
    ///
    /// Returns false if the entry was coalesced into the previous one.
    pub fn push(&mut self, command: impl Into<String>, before: T, group_id: Option<String>) -> bool {
        let command = command.into();
        let group_id = group_id.filter(|g| !g.is_empty());
        if group_id.is_some() && group_id == self.open_group && !self.past.is_empty() {
            debug!(target: TARGET, command = %command, group = ?group_id, "coalesced");
            return false;
        }
        self.future.clear();
        self.open_group.clone_from(&group_id);
        self.past.push_back(HistoryEntry {
            command,
            snapshot: Arc::new(before),
            group_id,
        });
        while self.past.len() > self.depth {
            self.past.pop_front();
        }
        debug!(target: TARGET, depth = self.past.len(), "pushed");
        true
    }

    /// Step back. `current` is parked on the future stack; the returned
    /// snapshot is the state to restore.
    pub fn undo(&mut self, current: T) -> Option<Arc<T>> {
        let entry = self.past.pop_back()?;
        self.open_group = None;
        debug!(target: TARGET, command = %entry.command, "undo");
        self.future.push_back(HistoryEntry {
            command: entry.command,
            snapshot: Arc::new(current),
            group_id: entry.group_id,
        });
        while self.future.len() > self.depth {
            self.future.pop_front();
        }
        Some(entry.snapshot)
    }

    /// Step forward again.
    pub fn redo(&mut self, current: T) -> Option<Arc<T>> {
        let entry = self.future.pop_back()?;
        self.open_group = None;
        debug!(target: TARGET, command = %entry.command, "redo");
        self.past.push_back(HistoryEntry {
            command: entry.command,
            snapshot: Arc::new(current),
            group_id: entry.group_id,
        });
        while self.past.len() > self.depth {
            self.past.pop_front();
        }
        Some(entry.snapshot)
    }

    // ====================================================================
    // Queries
    // ====================================================================

    /// Is there anything to undo?
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Is there anything to redo?
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Undo entries, oldest first.
    pub fn past(&self) -> impl Iterator<Item = &HistoryEntry<T>> {
        self.past.iter()
    }

    /// Redo entries, oldest first.
    pub fn future(&self) -> impl Iterator<Item = &HistoryEntry<T>> {
        self.future.iter()
    }

    /// Number of undo entries.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    /// Number of redo entries.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    /// Bound per stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.open_group = None;
    }
}
