//! Snapshot-based undo/redo
//!
//! Every history entry is the full serialized root sequence. The manager
//! never sees the tree itself: callers pass a closure that produces the
//! current snapshot, and it is only invoked when a snapshot is actually
//! needed.
//!
//! ## States
//!
//! - **Idle**: the next `record` pushes a snapshot.
//! - **Coalescing**: the last record was `"typing"`. Further typing only
//!   restarts the debounce; when it fires, the top entry is overwritten
//!   with a fresh snapshot and the manager returns to idle.
//!
//! The oldest entry is the baseline and is never popped by `undo`.

use tracing::debug;

use super::timer::Debounce;

/// Action type that coalesces.
pub const TYPING: &str = "typing";

/// Default stack capacity
pub const DEFAULT_CAPACITY: usize = 100;

/// Default coalescing window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// What `record` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A restore is in progress; nothing recorded
    Suppressed,
    /// Typing folded into the current entry
    Coalesced,
    /// Snapshot equal to the top entry; nothing pushed
    Unchanged,
    /// New entry pushed
    Pushed,
}

pub struct HistoryManager {
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
    capacity: usize,
    debounce: Debounce,
    last_action_type: Option<String>,
    restoring: bool,
    baseline_pending: bool,
}

impl HistoryManager {
    pub fn new(capacity: usize, debounce_ms: u64) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
            debounce: Debounce::new(debounce_ms),
            last_action_type: None,
            restoring: false,
            baseline_pending: false,
        }
    }

    /// Record a change.
    pub fn record<E>(
        &mut self,
        action_type: &str,
        now_ms: u64,
        snapshot: impl FnOnce() -> Result<String, E>,
    ) -> Result<RecordOutcome, E> {
        if self.restoring {
            return Ok(RecordOutcome::Suppressed);
        }

        if action_type == TYPING
            && self.last_action_type.as_deref() == Some(TYPING)
            && !self.undo_stack.is_empty()
        {
            self.debounce.schedule(now_ms);
            return Ok(RecordOutcome::Coalesced);
        }

        self.debounce.cancel();
        let snapshot = snapshot()?;
        self.last_action_type = Some(action_type.to_string());

        if self.undo_stack.last() == Some(&snapshot) {
            return Ok(RecordOutcome::Unchanged);
        }

        self.push(snapshot);
        debug!(action_type, depth = self.undo_stack.len(), "history entry pushed");
        Ok(RecordOutcome::Pushed)
    }

    fn push(&mut self, snapshot: String) {
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.capacity {
            self.undo_stack.remove(0);
            debug!(capacity = self.capacity, "oldest history entry evicted");
        }
    }

    /// Fire the typing debounce if it is due.
    ///
    /// Returns whether the top entry was overwritten.
    pub fn poll<E>(
        &mut self,
        now_ms: u64,
        snapshot: impl FnOnce() -> Result<String, E>,
    ) -> Result<bool, E> {
        if !self.debounce.is_due(now_ms) {
            return Ok(false);
        }
        self.finish_coalescing(snapshot)
    }

    /// Apply a pending typing overwrite now, regardless of the deadline.
    pub fn flush<E>(&mut self, snapshot: impl FnOnce() -> Result<String, E>) -> Result<bool, E> {
        if !self.debounce.is_pending() {
            return Ok(false);
        }
        self.finish_coalescing(snapshot)
    }

    fn finish_coalescing<E>(
        &mut self,
        snapshot: impl FnOnce() -> Result<String, E>,
    ) -> Result<bool, E> {
        self.debounce.cancel();
        self.last_action_type = None;
        let snapshot = snapshot()?;
        match self.undo_stack.last_mut() {
            Some(top) => {
                *top = snapshot;
                debug!(depth = self.undo_stack.len(), "typing coalesced into top entry");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Step back. Returns the snapshot to restore, or `None` at the baseline.
    pub fn undo(&mut self) -> Option<&str> {
        if self.undo_stack.len() <= 1 {
            return None;
        }
        self.debounce.cancel();
        self.last_action_type = None;
        let current = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        self.undo_stack.last().map(String::as_str)
    }

    /// Step forward. Returns the snapshot to restore, or `None` when there
    /// is nothing to redo.
    pub fn redo(&mut self) -> Option<&str> {
        let next = self.redo_stack.pop()?;
        self.debounce.cancel();
        self.last_action_type = None;
        self.undo_stack.push(next);
        self.undo_stack.last().map(String::as_str)
    }

    /// Forget everything, including a pending debounce or baseline.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.debounce.cancel();
        self.last_action_type = None;
        self.baseline_pending = false;
    }

    /// Clear, and capture the baseline on the next `settle_baseline`.
    pub fn record_initial_state(&mut self) {
        self.clear();
        self.baseline_pending = true;
    }

    pub fn is_baseline_pending(&self) -> bool {
        self.baseline_pending
    }

    /// Capture the deferred baseline if one is pending.
    pub fn settle_baseline<E>(
        &mut self,
        snapshot: impl FnOnce() -> Result<String, E>,
    ) -> Result<bool, E> {
        if !self.baseline_pending {
            return Ok(false);
        }
        self.baseline_pending = false;
        let snapshot = snapshot()?;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.undo_stack.push(snapshot);
        debug!("history baseline captured");
        Ok(true)
    }

    /// Mark the start of a snapshot restore; records are suppressed until
    /// `end_restore`.
    pub fn begin_restore(&mut self) {
        self.restoring = true;
    }

    pub fn end_restore(&mut self) {
        self.restoring = false;
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub fn is_coalescing(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current top snapshot
    pub fn top(&self) -> Option<&str> {
        self.undo_stack.last().map(String::as_str)
    }

    /// Oldest retained snapshot
    pub fn oldest(&self) -> Option<&str> {
        self.undo_stack.first().map(String::as_str)
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_DEBOUNCE_MS)
    }
}
