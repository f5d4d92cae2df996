//! Undo/redo log.
//!
//! Operations are recorded in source-logical coordinates ([`NrPosition`]) with their literal
//! text, so they stay valid while result chunks come and go. Operations performed inside a user
//! action form one unit; standalone single-character edits next to each other coalesce into one
//! unit, up to a bound, and never across a user-action boundary.

use crate::error::NotebookError;
use crate::notebook::{EditMode, Notebook};
use crate::position::NrPosition;

/// A recorded, reversible edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOp {
    /// `text` was inserted; it now spans `start..end`.
    Insert {
        /// Start of the inserted text.
        start: NrPosition,
        /// End of the inserted text.
        end: NrPosition,
        /// The inserted text.
        text: String,
    },
    /// `text`, which spanned `start..end`, was deleted.
    Delete {
        /// Start of the deleted range.
        start: NrPosition,
        /// End of the deleted range (before deletion).
        end: NrPosition,
        /// The deleted source text.
        text: String,
    },
}

impl UndoOp {
    /// The operation that reverts this one.
    pub fn inverse(&self) -> UndoOp {
        match self.clone() {
            UndoOp::Insert { start, end, text } => UndoOp::Delete { start, end, text },
            UndoOp::Delete { start, end, text } => UndoOp::Insert { start, end, text },
        }
    }

    /// Start position.
    pub fn start(&self) -> NrPosition {
        match self {
            UndoOp::Insert { start, .. } | UndoOp::Delete { start, .. } => *start,
        }
    }

    /// End position.
    pub fn end(&self) -> NrPosition {
        match self {
            UndoOp::Insert { end, .. } | UndoOp::Delete { end, .. } => *end,
        }
    }

    /// Literal text.
    pub fn text(&self) -> &str {
        match self {
            UndoOp::Insert { text, .. } | UndoOp::Delete { text, .. } => text,
        }
    }

    fn is_trivial(&self) -> bool {
        let mut chars = self.text().chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c != '\n')
    }

    /// Merge `next` into `self` if it continues the same single-line run.
    fn coalesce(&mut self, next: &UndoOp) -> bool {
        match (self, next) {
            (
                UndoOp::Insert { end, text, .. },
                UndoOp::Insert {
                    start: next_start,
                    end: next_end,
                    text: next_text,
                },
            ) if *next_start == *end => {
                text.push_str(next_text);
                *end = *next_end;
                true
            }
            (
                UndoOp::Delete { start, text, .. },
                UndoOp::Delete {
                    start: next_start,
                    end: next_end,
                    text: next_text,
                },
            ) if *next_end == *start => {
                // Backspace: the run grows to the left.
                text.insert_str(0, next_text);
                *start = *next_start;
                true
            }
            (
                UndoOp::Delete { start, end, text },
                UndoOp::Delete {
                    start: next_start,
                    text: next_text,
                    ..
                },
            ) if *next_start == *start => {
                // Forward delete: the run grows to the right in pre-deletion coordinates.
                text.push_str(next_text);
                end.offset += 1;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct UndoUnit {
    ops: Vec<UndoOp>,
    /// Still accepting coalesced single-character edits.
    open: bool,
}

impl UndoUnit {
    fn char_len(&self) -> usize {
        self.ops.iter().map(|op| op.text().chars().count()).sum()
    }
}

#[derive(Debug)]
pub(crate) struct UndoStack {
    undo: Vec<UndoUnit>,
    redo: Vec<UndoUnit>,
    max_undo: usize,
    max_coalesce: usize,
    /// Clean point tracking. Uses `undo.len()` as the saved position in the linear history.
    /// When `redo` is non-empty, `clean_index` may be greater than `undo.len()`.
    clean_index: Option<usize>,
    /// User-action nesting depth.
    depth: usize,
    group: Vec<UndoOp>,
}

impl UndoStack {
    pub(crate) fn new(max_undo: usize, max_coalesce: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_undo,
            max_coalesce,
            clean_index: Some(0),
            depth: 0,
            group: Vec::new(),
        }
    }

    pub(crate) fn can_undo(&self) -> bool {
        !self.undo.is_empty() || !self.group.is_empty()
    }

    pub(crate) fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub(crate) fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub(crate) fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub(crate) fn is_clean(&self) -> bool {
        self.group.is_empty() && self.clean_index == Some(self.undo.len())
    }

    pub(crate) fn mark_clean(&mut self) {
        self.flush_group();
        self.clean_index = Some(self.undo.len());
        self.close_coalescing();
    }

    pub(crate) fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.group.clear();
        self.clean_index = Some(0);
    }

    pub(crate) fn begin_user_action(&mut self) {
        if self.depth == 0 {
            self.close_coalescing();
        }
        self.depth += 1;
    }

    pub(crate) fn end_user_action(&mut self) {
        if self.depth == 0 {
            tracing::warn!("unbalanced end of user action");
            return;
        }
        self.depth -= 1;
        if self.depth == 0 {
            self.flush_group();
        }
    }

    pub(crate) fn record(&mut self, op: UndoOp) {
        self.clear_redo_and_adjust_clean();

        if self.depth > 0 {
            self.group.push(op);
            return;
        }

        let trivial = op.is_trivial();
        if trivial
            && self.clean_index != Some(self.undo.len())
            && let Some(last) = self.undo.last_mut()
            && last.open
            && last.char_len() < self.max_coalesce
            && let Some(previous) = last.ops.last_mut()
            && previous.coalesce(&op)
        {
            tracing::trace!(len = last.char_len(), "coalesced undo operation");
            return;
        }

        self.push_unit(UndoUnit {
            ops: vec![op],
            open: trivial,
        });
    }

    pub(crate) fn take_undo(&mut self) -> Option<Vec<UndoOp>> {
        self.flush_group();
        self.close_coalescing();
        self.undo.pop().map(|unit| unit.ops)
    }

    pub(crate) fn take_redo(&mut self) -> Option<Vec<UndoOp>> {
        self.redo.pop().map(|unit| unit.ops)
    }

    pub(crate) fn push_undone(&mut self, ops: Vec<UndoOp>) {
        self.redo.push(UndoUnit { ops, open: false });
    }

    pub(crate) fn push_redone(&mut self, ops: Vec<UndoOp>) {
        self.undo.push(UndoUnit { ops, open: false });
    }

    fn close_coalescing(&mut self) {
        if let Some(last) = self.undo.last_mut() {
            last.open = false;
        }
    }

    fn flush_group(&mut self) {
        if self.group.is_empty() {
            return;
        }
        let ops = std::mem::take(&mut self.group);
        self.push_unit(UndoUnit { ops, open: false });
    }

    fn clear_redo_and_adjust_clean(&mut self) {
        if self.redo.is_empty() {
            return;
        }

        // A clean point in the redo area becomes unreachable.
        if let Some(clean_index) = self.clean_index
            && clean_index > self.undo.len()
        {
            self.clean_index = None;
        }

        self.redo.clear();
    }

    fn push_unit(&mut self, unit: UndoUnit) {
        self.close_coalescing();
        if self.undo.len() >= self.max_undo {
            self.undo.remove(0);
            self.clean_index = match self.clean_index {
                Some(0) | None => None,
                Some(index) => Some(index - 1),
            };
        }
        self.undo.push(unit);
    }
}

impl Notebook {
    /// Start a user action: edits until the matching [`end_user_action`](Self::end_user_action)
    /// undo as one unit. Nested pairs are counted; only the outermost one closes the unit.
    pub fn begin_user_action(&mut self) {
        self.undo.begin_user_action();
    }

    /// End a user action.
    pub fn end_user_action(&mut self) {
        self.undo.end_user_action();
        self.set_code_modified(!self.undo.is_clean());
    }

    /// Whether there is something to undo.
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    /// Whether there is something to redo.
    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Number of undo units.
    pub fn undo_depth(&self) -> usize {
        self.undo.undo_depth()
    }

    /// Number of redo units.
    pub fn redo_depth(&self) -> usize {
        self.undo.redo_depth()
    }

    /// Revert the most recent undo unit.
    pub fn undo(&mut self) -> Result<(), NotebookError> {
        let ops = self.undo.take_undo().ok_or(NotebookError::NothingToUndo)?;
        tracing::debug!(ops = ops.len(), "undo");
        let replayed = self.replay(ops.iter().rev().map(UndoOp::inverse));
        self.undo.push_undone(ops);
        self.set_code_modified(!self.undo.is_clean());
        replayed?;
        self.finish_operation()
    }

    /// Re-apply the most recently undone unit.
    pub fn redo(&mut self) -> Result<(), NotebookError> {
        let ops = self.undo.take_redo().ok_or(NotebookError::NothingToRedo)?;
        tracing::debug!(ops = ops.len(), "redo");
        let replayed = self.replay(ops.iter().cloned());
        self.undo.push_redone(ops);
        self.set_code_modified(!self.undo.is_clean());
        replayed?;
        self.finish_operation()
    }

    fn replay(&mut self, ops: impl Iterator<Item = UndoOp>) -> Result<(), NotebookError> {
        let previous = self.mode;
        self.mode = EditMode::ReplayingUndo;
        let result = ops
            .into_iter()
            .try_for_each(|op| self.replay_op(&op));
        self.mode = previous;
        result
    }

    fn replay_op(&mut self, op: &UndoOp) -> Result<(), NotebookError> {
        tracing::trace!(?op, "replaying undo operation");
        let start = self.position_from_nr(op.start())?;
        match op {
            UndoOp::Insert { text, .. } => {
                self.apply_insert(start, text, false)?;
            }
            UndoOp::Delete { .. } => {
                let end = self.position_from_nr(op.end())?;
                self.apply_delete(start, end, false)?;
            }
        }
        Ok(())
    }
}
