//! The notebook document and its edit entry points.
//!
//! Every edit goes through [`Notebook::apply_insert`] / [`Notebook::apply_delete`], which consult
//! the current [`EditMode`]:
//!
//! - `Idle`: a fresh edit. It is fully processed (rescan, result fixups) and recorded for undo.
//! - `ApplyingEdit`: an edit triggered while another is being processed. Processed, not recorded.
//! - `SynchronizingResults`: result text being inserted or removed by the engine itself. Only the
//!   raw buffer text changes; the caller keeps the chunk model in step.
//! - `ReplayingUndo`: an undo/redo replay. Processed, never recorded.

use crate::chunk::{Chunk, ChunkId, ChunkKind, Statement};
use crate::config::NotebookConfig;
use crate::error::NotebookError;
use crate::events::NotebookCallback;
use crate::line_index::LineIndex;
use crate::model::{ChunkIter, ChunkModel};
use crate::position::{NrPosition, Position};
use crate::undo::{UndoOp, UndoStack};
use std::fmt;
use std::path::PathBuf;

/// What the engine is doing while an edit reaches the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditMode {
    Idle,
    ApplyingEdit,
    SynchronizingResults,
    ReplayingUndo,
}

/// A notebook document: buffer text, its chunk partition, and the undo history.
///
/// Source lines and rendered result lines live in the same buffer. Callers edit through
/// [`insert`](Self::insert) / [`delete`](Self::delete), which refuse to touch result text, and
/// read the classification through [`chunks`](Self::chunks) / [`chunk_at`](Self::chunk_at).
///
/// # Example
///
/// ```rust
/// use notebook_core::{ChunkType, Notebook};
///
/// let mut notebook = Notebook::new();
/// notebook.insert(0, 0, "1\n\n#2\ndef a():\n  3").unwrap();
///
/// let chunks: Vec<_> = notebook
///     .chunks()
///     .map(|chunk| (chunk.chunk_type(), chunk.start(), chunk.end()))
///     .collect();
/// assert_eq!(
///     chunks,
///     vec![
///         (ChunkType::Statement, 0, 0),
///         (ChunkType::Blank, 1, 1),
///         (ChunkType::Comment, 2, 2),
///         (ChunkType::Statement, 3, 4),
///     ]
/// );
/// ```
pub struct Notebook {
    pub(crate) text: LineIndex,
    pub(crate) model: ChunkModel,
    pub(crate) mode: EditMode,
    pub(crate) undo: UndoStack,
    pub(crate) config: NotebookConfig,
    pub(crate) filename: Option<PathBuf>,
    pub(crate) code_modified: bool,
    pub(crate) version: u64,
    pub(crate) callbacks: Vec<NotebookCallback>,
    pub(crate) cursor: Position,
}

impl fmt::Debug for Notebook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notebook")
            .field("lines", &self.model.line_count())
            .field("chunks", &self.model.chunks.len())
            .field("filename", &self.filename)
            .field("code_modified", &self.code_modified)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Self::new()
    }
}

impl Notebook {
    /// Create an empty notebook with default settings.
    pub fn new() -> Self {
        Self::with_config(NotebookConfig::default())
    }

    /// Create an empty notebook.
    pub fn with_config(config: NotebookConfig) -> Self {
        Self {
            text: LineIndex::new(),
            model: ChunkModel::new(),
            mode: EditMode::Idle,
            undo: UndoStack::new(config.max_undo, config.max_coalesce),
            config,
            filename: None,
            code_modified: false,
            version: 0,
            callbacks: Vec::new(),
            cursor: Position::default(),
        }
    }

    /// Settings.
    pub fn config(&self) -> &NotebookConfig {
        &self.config
    }

    /// Number of buffer lines, result lines included.
    pub fn line_count(&self) -> usize {
        self.text.line_count()
    }

    /// Text of one buffer line (source or result).
    pub fn line_text(&self, line: usize) -> Option<String> {
        self.text.line_text(line)
    }

    /// Complete buffer text, result lines included.
    pub fn buffer_text(&self) -> String {
        self.text.text()
    }

    /// Chunk containing `line`.
    pub fn chunk_at(&self, line: usize) -> Option<&Chunk> {
        self.model.chunk_at(line)
    }

    /// Chunk by id, if it still exists.
    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.model.chunk(id)
    }

    /// All chunks in line order.
    pub fn chunks(&self) -> ChunkIter<'_> {
        self.model.iter()
    }

    /// Chunks intersecting `from..=to`, in line order.
    pub fn chunks_in(&self, from: usize, to: usize) -> ChunkIter<'_> {
        self.model.iter_range(from, to)
    }

    /// Tracked cursor position.
    pub fn cursor(&self) -> Position {
        self.cursor
    }

    /// Move the tracked cursor.
    pub fn set_cursor(&mut self, position: Position) -> Result<(), NotebookError> {
        self.char_offset(position)?;
        self.cursor = position;
        Ok(())
    }

    /// Whether the source differs from the last load/save point.
    pub fn is_code_modified(&self) -> bool {
        self.code_modified
    }

    /// Insert `text` at `(line, offset)` as a user edit.
    ///
    /// Returns the cursor position after the edit (the end of the inserted text). Inserting on a
    /// result line is refused with [`NotebookError::ReadOnlyResult`].
    pub fn insert(
        &mut self,
        line: usize,
        offset: usize,
        text: &str,
    ) -> Result<Position, NotebookError> {
        tracing::debug!(line, offset, len = text.len(), "insert");
        let end = self.apply_insert(Position::new(line, offset), text, true)?;
        self.set_code_modified(!self.undo.is_clean());
        self.finish_operation()?;
        Ok(end)
    }

    /// Delete the text between two positions as a user edit.
    ///
    /// Deletes that would merge result text into a neighbouring chunk are converted into safe
    /// joins; deletes entirely inside result text are refused with
    /// [`NotebookError::ReadOnlyResult`]. Returns the cursor position after the edit.
    pub fn delete(
        &mut self,
        start_line: usize,
        start_offset: usize,
        end_line: usize,
        end_offset: usize,
    ) -> Result<Position, NotebookError> {
        tracing::debug!(start_line, start_offset, end_line, end_offset, "delete");
        let at = self.apply_delete(
            Position::new(start_line, start_offset),
            Position::new(end_line, end_offset),
            true,
        )?;
        self.set_code_modified(!self.undo.is_clean());
        self.finish_operation()?;
        Ok(at)
    }

    /// Check every document invariant.
    pub fn validate(&self) -> Result<(), NotebookError> {
        if self.model.line_count() != self.text.line_count() {
            return Err(NotebookError::invariant(format!(
                "{} line slots for {} buffer lines",
                self.model.line_count(),
                self.text.line_count()
            )));
        }
        self.model.validate()?;

        for (line, slot) in self.model.slots.iter().enumerate() {
            let is_result = self.model.is_result_line(line);
            let expected = if is_result {
                None
            } else {
                self.text.line_text(line)
            };
            if slot.text != expected {
                return Err(NotebookError::invariant(format!(
                    "line {line} was classified from stale text"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn finish_operation(&mut self) -> Result<(), NotebookError> {
        self.model.collect_garbage();
        #[cfg(debug_assertions)]
        self.validate()?;
        self.version += 1;
        Ok(())
    }

    pub(crate) fn char_offset(&self, position: Position) -> Result<usize, NotebookError> {
        self.text
            .position_to_char(position.line, position.offset)
            .ok_or(NotebookError::InvalidPosition {
                line: position.line,
                offset: position.offset,
            })
    }

    pub(crate) fn line_len(&self, line: usize) -> usize {
        self.text.line_len(line).unwrap_or(0)
    }

    pub(crate) fn line_end(&self, line: usize) -> Position {
        Position::new(line, self.line_len(line))
    }

    pub(crate) fn statement(&self, id: ChunkId) -> Result<&Statement, NotebookError> {
        self.model
            .chunk(id)
            .and_then(Chunk::as_statement)
            .ok_or_else(|| NotebookError::invariant(format!("chunk {id:?} is not a statement")))
    }

    pub(crate) fn statement_mut(&mut self, id: ChunkId) -> Result<&mut Statement, NotebookError> {
        self.model
            .chunk_mut(id)
            .and_then(Chunk::as_statement_mut)
            .ok_or_else(|| NotebookError::invariant(format!("chunk {id:?} is not a statement")))
    }

    /// Insert entry point shared by user edits, undo replay, loading and result rendering.
    pub(crate) fn apply_insert(
        &mut self,
        at: Position,
        text: &str,
        interactive: bool,
    ) -> Result<Position, NotebookError> {
        let char_offset = self.char_offset(at)?;
        if self.mode == EditMode::SynchronizingResults {
            self.text.insert(char_offset, text);
            return Ok(at);
        }
        if interactive && self.model.is_result_line(at.line) {
            tracing::warn!(line = at.line, "refusing to insert into result text");
            return Err(NotebookError::ReadOnlyResult { line: at.line });
        }
        if text.is_empty() {
            return Ok(at);
        }

        let previous = self.mode;
        let record = previous == EditMode::Idle;
        if record {
            self.mode = EditMode::ApplyingEdit;
        }
        let result = self.process_insert(at, char_offset, text, record);
        self.mode = previous;
        result
    }

    fn process_insert(
        &mut self,
        at: Position,
        char_offset: usize,
        text: &str,
        record: bool,
    ) -> Result<Position, NotebookError> {
        self.model.collect_garbage();
        let start_nr = self.nr_position(at)?;
        self.text.insert(char_offset, text);

        let added = text.matches('\n').count();
        let end = match text.rfind('\n') {
            Some(index) => Position::new(at.line + added, text[index + 1..].chars().count()),
            None => Position::new(at.line, at.offset + text.chars().count()),
        };

        // Whole lines inserted before `at.line` leave that line's text untouched; it moves down
        // together with its chunk.
        let whole_lines = at.offset == 0 && text.ends_with('\n');
        let (fixup, window) = if whole_lines {
            let fixup = self.capture_fixup(at.line, at.line);
            for chunk in self.model.chunks.values_mut() {
                if chunk.start >= at.line {
                    chunk.start += added;
                }
                if chunk.end >= at.line {
                    chunk.end += added;
                }
            }
            self.model.insert_slots(at.line, added, None);
            (fixup, at.line..at.line + added)
        } else {
            let fixup = self.capture_fixup(at.line, at.line + 1);
            for chunk in self.model.chunks.values_mut() {
                if chunk.start > at.line {
                    chunk.start += added;
                }
                if chunk.end > at.line {
                    chunk.end += added;
                }
            }
            self.model.insert_slots(at.line + 1, added, None);
            (fixup, at.line..at.line + added + 1)
        };

        self.rescan(window.start, window.end, false)?;

        if record {
            let end_nr = if added == 0 {
                NrPosition::new(start_nr.line, end.offset)
            } else {
                NrPosition::new(start_nr.line + added, end.offset)
            };
            self.undo.record(UndoOp::Insert {
                start: start_nr,
                end: end_nr,
                text: text.to_string(),
            });
        }

        self.cursor = end;
        self.fixup_results(fixup)?;
        self.model.renumber_from(0);
        Ok(self.cursor)
    }

    /// Delete entry point shared by user edits, undo replay and result removal.
    pub(crate) fn apply_delete(
        &mut self,
        start: Position,
        end: Position,
        interactive: bool,
    ) -> Result<Position, NotebookError> {
        let (start, end) = (start.min(end), start.max(end));
        let from = self.char_offset(start)?;
        let to = self.char_offset(end)?;
        if self.mode == EditMode::SynchronizingResults {
            self.text.remove(from, to);
            return Ok(start);
        }
        if start == end {
            return Ok(start);
        }

        let previous = self.mode;
        let record = previous == EditMode::Idle;
        if record {
            self.mode = EditMode::ApplyingEdit;
        }
        let result = self.process_delete(start, end, interactive, record);
        self.mode = previous;
        result
    }

    fn process_delete(
        &mut self,
        mut start: Position,
        mut end: Position,
        interactive: bool,
        record: bool,
    ) -> Result<Position, NotebookError> {
        self.model.collect_garbage();

        let mut restore = None;
        if interactive {
            if let Some((result, owner, first, last)) = self.result_span(start.line) {
                if end.line <= last {
                    tracing::warn!(line = first, "refusing to delete inside result text");
                    return Err(NotebookError::ReadOnlyResult { line: first });
                }
                if start == self.line_end(last) {
                    // Joining the next line onto the result: join it onto the statement instead
                    // and put the result back afterwards.
                    let removed = last + 1 - first;
                    self.delete_chunk(result)?;
                    restore = Some(owner);
                    start = self.line_end(first - 1);
                    end.line -= removed;
                } else {
                    start = Position::new(last + 1, 0);
                }
            }
            if let Some((_, _, first, _)) = self.result_span(end.line) {
                let whole_lines = end == Position::new(first, 0) && start.offset == 0;
                if !whole_lines {
                    end = self.line_end(first - 1);
                }
            }
            if start >= end {
                self.cursor = start;
                return Ok(start);
            }
        }

        let (deleted_lines, window_start, window_end, last_modified) =
            match (start.offset == 0, end.offset == 0) {
                (true, true) => (
                    Some((start.line, end.line - 1)),
                    start.line,
                    start.line,
                    end.line - 1,
                ),
                (true, false) if start.line == end.line => {
                    (None, start.line, start.line + 1, start.line)
                }
                (true, false) => (
                    Some((start.line, end.line - 1)),
                    start.line,
                    start.line + 1,
                    end.line,
                ),
                (false, _) => (
                    (end.line > start.line).then_some((start.line + 1, end.line)),
                    start.line,
                    start.line + 1,
                    end.line,
                ),
            };

        let start_nr = self.nr_position(start)?;
        let end_nr = self.nr_position(end)?;
        let deleted = self.source_text(start, end);
        let from = self.char_offset(start)?;
        let to = self.char_offset(end)?;
        self.text.remove(from, to);

        if record {
            self.undo.record(UndoOp::Delete {
                start: start_nr,
                end: end_nr,
                text: deleted,
            });
        }

        let mut fixup = self.capture_fixup(window_start, last_modified + 1);
        if let Some(owner) = restore {
            fixup.include(owner);
        }

        let mut entire_statements_deleted = false;
        let mut rescan_start = window_start;
        let mut rescan_end = window_end;
        if let Some((first, last)) = deleted_lines {
            let removed = last + 1 - first;
            let mut gone = Vec::new();
            for chunk in self.model.chunks.values_mut() {
                if chunk.start >= first && chunk.end <= last {
                    entire_statements_deleted |= matches!(chunk.kind, ChunkKind::Statement(_));
                    gone.push(chunk.id);
                    continue;
                }
                let lost_lines = chunk.start <= last && chunk.end >= first;
                if chunk.end > last {
                    chunk.end -= removed;
                } else if chunk.end >= first {
                    chunk.end = first - 1;
                }
                if chunk.start > last {
                    chunk.start -= removed;
                } else if chunk.start >= first {
                    chunk.start = first;
                }
                // A statement that lost its head or tail must be reclassified as a whole.
                if lost_lines && matches!(chunk.kind, ChunkKind::Statement(_)) {
                    rescan_start = rescan_start.min(chunk.start);
                    rescan_end = rescan_end.max(chunk.end + 1);
                }
            }
            for id in gone {
                self.model.chunks.remove(&id);
            }
            self.model.remove_slots(first, last);
        }

        tracing::trace!(
            ?deleted_lines,
            rescan_start,
            rescan_end,
            entire_statements_deleted,
            "delete reshaped chunks"
        );
        self.rescan(rescan_start, rescan_end, entire_statements_deleted)?;

        self.cursor = start;
        self.fixup_results(fixup)?;

        if let Some(owner) = restore
            && let Some(result) = self.find_result(owner)
        {
            let first = self.model.chunk(result).map_or(0, |chunk| chunk.start);
            if first > 0 && self.cursor.line >= first {
                self.cursor = self.line_end(first - 1);
            }
        }

        self.model.renumber_from(0);
        Ok(self.cursor)
    }

    /// `(result, owner, first line, last line)` of the result chunk at `line`.
    fn result_span(&self, line: usize) -> Option<(ChunkId, ChunkId, usize, usize)> {
        let chunk = self.model.chunk_at(line)?;
        match chunk.kind {
            ChunkKind::Result(block) if chunk.start > 0 => {
                Some((chunk.id, block.owner, chunk.start, chunk.end))
            }
            _ => None,
        }
    }

    /// Source text between two positions; result lines are skipped.
    fn source_text(&self, start: Position, end: Position) -> String {
        let mut text = String::new();
        for line in start.line..=end.line {
            if self.model.is_result_line(line) {
                continue;
            }
            let content = self.text.line_text(line).unwrap_or_default();
            let from = if line == start.line { start.offset } else { 0 };
            let to = if line == end.line {
                end.offset
            } else {
                content.chars().count()
            };
            text.extend(content.chars().skip(from).take(to.saturating_sub(from)));
            if line < end.line {
                text.push('\n');
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkType;
    use pretty_assertions::assert_eq;

    fn layout(notebook: &Notebook) -> Vec<(ChunkType, usize, usize)> {
        notebook
            .chunks()
            .map(|chunk| (chunk.chunk_type(), chunk.start(), chunk.end()))
            .collect()
    }

    #[test]
    fn test_new_notebook_is_one_blank_chunk() {
        let notebook = Notebook::new();
        assert_eq!(layout(&notebook), vec![(ChunkType::Blank, 0, 0)]);
        assert_eq!(notebook.line_count(), 1);
        notebook.validate().unwrap();
    }

    #[test]
    fn test_insert_returns_end_of_text() {
        let mut notebook = Notebook::new();
        assert_eq!(notebook.insert(0, 0, "ab\ncd").unwrap(), Position::new(1, 2));
        assert_eq!(notebook.insert(1, 2, "e").unwrap(), Position::new(1, 3));
        assert_eq!(notebook.cursor(), Position::new(1, 3));
    }

    #[test]
    fn test_insert_rejects_invalid_position() {
        let mut notebook = Notebook::new();
        assert!(matches!(
            notebook.insert(0, 3, "x"),
            Err(NotebookError::InvalidPosition { line: 0, offset: 3 })
        ));
        assert!(matches!(
            notebook.insert(2, 0, "x"),
            Err(NotebookError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_typing_keeps_statement_identity_until_text_changes() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "a\nb").unwrap();
        let first = notebook.chunk_at(0).unwrap().id();
        let second = notebook.chunk_at(1).unwrap().id();

        notebook.insert(1, 1, "c").unwrap();
        assert_eq!(notebook.chunk_at(0).unwrap().id(), first);
        assert_eq!(notebook.chunk_at(1).unwrap().id(), second);
        assert_eq!(
            notebook.chunk_at(1).unwrap().as_statement().unwrap().text(),
            "bc"
        );
    }

    #[test]
    fn test_whole_line_insert_moves_statement_down() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "a\nb").unwrap();
        let second = notebook.chunk_at(1).unwrap().id();

        notebook.insert(1, 0, "x\n").unwrap();
        assert_eq!(notebook.chunk_at(2).unwrap().id(), second);
        assert_eq!(
            layout(&notebook),
            vec![
                (ChunkType::Statement, 0, 0),
                (ChunkType::Statement, 1, 1),
                (ChunkType::Statement, 2, 2),
            ]
        );
    }

    #[test]
    fn test_whole_line_insert_before_continuation_joins_statement() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "  y").unwrap();
        notebook.insert(0, 0, "x\n").unwrap();
        assert_eq!(layout(&notebook), vec![(ChunkType::Statement, 0, 1)]);
        assert_eq!(
            notebook.chunk_at(0).unwrap().as_statement().unwrap().text(),
            "x\n  y"
        );
    }

    #[test]
    fn test_blank_runs_stay_maximal_across_window_edge() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "a\n\n\n\nb").unwrap();
        notebook.insert(2, 0, " ").unwrap();
        assert_eq!(
            layout(&notebook),
            vec![
                (ChunkType::Statement, 0, 0),
                (ChunkType::Blank, 1, 3),
                (ChunkType::Statement, 4, 4),
            ]
        );
        notebook.delete(1, 0, 3, 0).unwrap();
        assert_eq!(
            layout(&notebook),
            vec![
                (ChunkType::Statement, 0, 0),
                (ChunkType::Blank, 1, 1),
                (ChunkType::Statement, 2, 2),
            ]
        );
    }

    #[test]
    fn test_delete_head_of_multiline_statement() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "a\nb\n  c\n  d").unwrap();
        // Join "a" with the second continuation line, dropping "b" and "  c".
        notebook.delete(0, 1, 3, 0).unwrap();
        assert_eq!(notebook.text(), "a  d");
        assert_eq!(layout(&notebook), vec![(ChunkType::Statement, 0, 0)]);
    }

    #[test]
    fn test_delete_whole_buffer() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "a = 1\n# c\n\nb").unwrap();
        notebook.delete(0, 0, 3, 1).unwrap();
        assert_eq!(notebook.text(), "");
        assert_eq!(layout(&notebook), vec![(ChunkType::Blank, 0, 0)]);
    }

    #[test]
    fn test_version_and_modified_flag() {
        let mut notebook = Notebook::new();
        let version = notebook.version();
        assert!(!notebook.is_code_modified());
        notebook.insert(0, 0, "x").unwrap();
        assert!(notebook.has_changed_since(version));
        assert!(notebook.is_code_modified());
        notebook.undo().unwrap();
        assert!(!notebook.is_code_modified());
    }
}
