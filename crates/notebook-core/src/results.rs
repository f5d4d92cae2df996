//! Result synchronizer.
//!
//! Result chunks are buffer text the engine owns: it renders them after their statement, removes
//! them when the statement is recompiled, and moves them when an edit leaves them somewhere other
//! than directly below their statement. All of that text goes through the buffer in
//! `SynchronizingResults` mode, which touches the rope only; the chunk model is updated here.

use crate::chunk::{ChunkId, ChunkKind, ResultBlock};
use crate::error::NotebookError;
use crate::events::NotebookEvent;
use crate::execution::ResultValue;
use crate::model::LineSlot;
use crate::notebook::{EditMode, Notebook};
use crate::position::Position;
use rustc_hash::FxHashSet;

/// Statements whose result placement must be checked once an edit has been rescanned.
#[derive(Debug, Default)]
pub(crate) struct FixupState {
    owners: Vec<ChunkId>,
}

impl FixupState {
    pub(crate) fn include(&mut self, owner: ChunkId) {
        self.owners.push(owner);
    }
}

impl Notebook {
    /// Record the statements around an edit of lines `first..after_line` (in the pre-edit layout)
    /// together with the owners of any results nearby.
    pub(crate) fn capture_fixup(&self, first: usize, after_line: usize) -> FixupState {
        let mut state = FixupState::default();
        let line_count = self.model.line_count();

        let mut line = first.min(line_count);
        while line > 0 {
            let Some(chunk) = self.model.chunk_at(line - 1) else {
                break;
            };
            match &chunk.kind {
                ChunkKind::Result(block) => {
                    state.include(block.owner);
                    line = chunk.start.min(line - 1);
                }
                ChunkKind::Statement(_) => {
                    state.include(chunk.id);
                    break;
                }
                ChunkKind::Blank | ChunkKind::Comment => break,
            }
        }

        for line in first..after_line.min(line_count) {
            match self.model.chunk_at(line).map(|chunk| (chunk.id, &chunk.kind)) {
                Some((id, ChunkKind::Statement(_))) => state.include(id),
                Some((_, ChunkKind::Result(block))) => state.include(block.owner),
                _ => {}
            }
        }

        let mut line = after_line;
        while line < line_count {
            let Some(chunk) = self.model.chunk_at(line) else {
                break;
            };
            match &chunk.kind {
                ChunkKind::Result(block) => state.include(block.owner),
                ChunkKind::Statement(_) if chunk.start < after_line => {}
                _ => break,
            }
            line = chunk.end.max(line) + 1;
        }

        tracing::trace!(first, after_line, owners = state.owners.len(), "captured result owners");
        state
    }

    /// Put every captured statement's result directly below it, and drop results whose statement
    /// is gone or was absorbed into a statement.
    ///
    /// Besides the captured owners, every result that is no longer intact directly below a live
    /// statement is fixed as well: a widened rescan can reach statements the capture never saw.
    pub(crate) fn fixup_results(&mut self, state: FixupState) -> Result<(), NotebookError> {
        let mut owners = state.owners;
        owners.extend(self.model.chunks.values().filter_map(|chunk| match chunk.kind {
            ChunkKind::Result(block) if !self.result_in_place(chunk.id, block.owner) => {
                Some(block.owner)
            }
            _ => None,
        }));

        let mut seen = FxHashSet::default();
        for owner in owners {
            if seen.insert(owner) {
                self.fixup_owner(owner)?;
            }
        }
        Ok(())
    }

    fn fixup_owner(&mut self, owner: ChunkId) -> Result<(), NotebookError> {
        let results: Vec<ChunkId> = self
            .model
            .chunks
            .values()
            .filter(|chunk| matches!(chunk.kind, ChunkKind::Result(block) if block.owner == owner))
            .map(|chunk| chunk.id)
            .collect();

        let wanted = self.model.is_alive(owner)
            && self
                .model
                .chunk(owner)
                .and_then(|chunk| chunk.as_statement())
                .is_some_and(|statement| statement.has_output());

        let in_place = match results.as_slice() {
            [only] => self.find_result(owner) == Some(*only)
                && self.model.chunk(*only).is_some_and(|chunk| self.model.owns_all(chunk)),
            _ => false,
        };
        if wanted && in_place {
            return Ok(());
        }

        for result in results {
            self.delete_chunk(result)?;
        }
        if wanted {
            tracing::debug!(owner = owner.get(), "moving result below its statement");
            self.insert_result(owner)?;
        }
        Ok(())
    }

    fn result_in_place(&self, result: ChunkId, owner: ChunkId) -> bool {
        self.model.is_alive(owner)
            && self.find_result(owner) == Some(result)
            && self.model.chunk(result).is_some_and(|chunk| self.model.owns_all(chunk))
    }

    /// The result chunk directly below statement `id`.
    pub(crate) fn find_result(&self, id: ChunkId) -> Option<ChunkId> {
        let chunk = self.model.chunk(id)?;
        let next = self.model.chunk_at(chunk.end + 1)?;
        match next.kind {
            ChunkKind::Result(block) if block.owner == id && next.start == chunk.end + 1 => {
                Some(next.id)
            }
            _ => None,
        }
    }

    /// Remove a result chunk and its text.
    pub(crate) fn delete_chunk(&mut self, id: ChunkId) -> Result<(), NotebookError> {
        let (start, end) = self
            .model
            .chunk(id)
            .map(|chunk| (chunk.start, chunk.end))
            .ok_or_else(|| NotebookError::invariant(format!("deleting unknown chunk {id:?}")))?;
        let removed = end + 1 - start;
        let line_count = self.text.line_count();
        let whole_buffer = start == 0 && end + 1 >= line_count;

        let (from, to) = if end + 1 < line_count {
            (Position::new(start, 0), Position::new(end + 1, 0))
        } else if start > 0 {
            (self.line_end(start - 1), self.line_end(end))
        } else {
            (Position::new(0, 0), self.line_end(end))
        };
        self.synchronizing(|notebook| notebook.apply_delete(from, to, false))?;

        self.model.chunks.remove(&id);
        self.model.remove_slots(start, end.min(self.model.line_count().saturating_sub(1)));

        if whole_buffer {
            let blank = self.model.alloc(0, 0, ChunkKind::Blank);
            self.model.slots.push(LineSlot {
                chunk: Some(blank),
                text: Some(String::new()),
            });
            self.cursor = Position::default();
            return Ok(());
        }

        for chunk in self.model.chunks.values_mut() {
            if chunk.start > end {
                chunk.start -= removed;
            } else if chunk.start >= start {
                chunk.start = start;
            }
            if chunk.end > end {
                chunk.end -= removed;
            } else if chunk.end >= start {
                chunk.end = start.saturating_sub(1);
            }
        }

        if self.cursor.line > end {
            self.cursor.line -= removed;
        } else if self.cursor.line >= start {
            self.cursor = if start > 0 {
                self.line_end(start - 1)
            } else {
                Position::default()
            };
        }

        self.merge_runs_at(start);
        Ok(())
    }

    /// Merge the chunks meeting at `line` if they are runs of the same kind.
    fn merge_runs_at(&mut self, line: usize) {
        if line == 0 {
            return;
        }
        let (Some(above), Some(below)) = (self.model.chunk_at(line - 1), self.model.chunk_at(line))
        else {
            return;
        };
        let same_run = above.id != below.id
            && matches!(
                (&above.kind, &below.kind),
                (ChunkKind::Blank, ChunkKind::Blank) | (ChunkKind::Comment, ChunkKind::Comment)
            );
        if !same_run {
            return;
        }
        let (keep, drop, end) = (above.id, below.id, below.end);
        if let Some(chunk) = self.model.chunk_mut(keep) {
            chunk.end = end;
        }
        self.model.claim(keep, line, end);
        self.model.chunks.remove(&drop);
    }

    /// Render statement `stmt`'s output below it. Returns the new result chunk, if any.
    pub(crate) fn insert_result(
        &mut self,
        stmt: ChunkId,
    ) -> Result<Option<ChunkId>, NotebookError> {
        let statement = self.statement(stmt)?;
        if !statement.has_output() {
            return Ok(None);
        }

        let mut text = String::new();
        let mut rich_lines = Vec::new();
        let is_error = match statement.error() {
            Some(err) => {
                text.push('\n');
                text.push_str(err.message());
                true
            }
            None => {
                for value in statement.results().unwrap_or_default() {
                    match value {
                        ResultValue::Text(value) => {
                            text.push('\n');
                            text.push_str(value);
                        }
                        ResultValue::Rich(rich) => {
                            rich_lines.push(text.matches('\n').count());
                            text.push('\n');
                            tracing::trace!(label = rich.label(), "rich result placeholder");
                        }
                    }
                }
                false
            }
        };

        let statement_end = self
            .model
            .chunk(stmt)
            .map(|chunk| chunk.end)
            .ok_or_else(|| NotebookError::invariant("statement vanished while rendering"))?;
        let at = self.line_end(statement_end);
        self.synchronizing(|notebook| notebook.apply_insert(at, &text, false))?;

        let added = text.matches('\n').count();
        for chunk in self.model.chunks.values_mut() {
            if chunk.start > statement_end {
                chunk.start += added;
            }
            if chunk.end > statement_end {
                chunk.end += added;
            }
        }
        let result = self.model.alloc(
            statement_end + 1,
            statement_end + added,
            ChunkKind::Result(ResultBlock {
                is_error,
                owner: stmt,
            }),
        );
        self.model
            .insert_slots(statement_end + 1, added, Some(result));
        self.model.compute_nr_start(result);

        if self.cursor.line > statement_end {
            self.cursor.line += added;
        }

        self.notify_chunk(result);
        for line in rich_lines {
            self.emit(NotebookEvent::RichResultAdded {
                line: statement_end + 1 + line,
            });
        }
        Ok(Some(result))
    }

    fn synchronizing<T>(
        &mut self,
        edit: impl FnOnce(&mut Self) -> Result<T, NotebookError>,
    ) -> Result<T, NotebookError> {
        let previous = self.mode;
        self.mode = EditMode::SynchronizingResults;
        let result = edit(self);
        self.mode = previous;
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::chunk::{ChunkKind, ChunkType};
    use crate::error::{ExecutionError, SyntaxError};
    use crate::execution::{CompiledStatement, ExecutionBackend, ExecutionContext};
    use crate::notebook::Notebook;
    use crate::position::Position;
    use pretty_assertions::assert_eq;

    /// Echoes each statement's text back as its result; `!` statements fail to compile.
    struct Echo;

    impl ExecutionBackend for Echo {
        fn compile(&mut self, source: &str) -> Result<CompiledStatement, SyntaxError> {
            if source.starts_with('!') {
                return Err(SyntaxError::new("bad statement", 1, Some(0)));
            }
            Ok(CompiledStatement::new(source.to_string()))
        }

        fn execute(
            &mut self,
            statement: &CompiledStatement,
            _parent: Option<&ExecutionContext>,
        ) -> Result<ExecutionContext, ExecutionError> {
            let source = statement.downcast_ref::<String>().cloned().unwrap_or_default();
            Ok(ExecutionContext::new((), vec![source.into()]))
        }
    }

    fn layout(notebook: &Notebook) -> Vec<(ChunkType, usize, usize)> {
        notebook
            .chunks()
            .map(|chunk| (chunk.chunk_type(), chunk.start(), chunk.end()))
            .collect()
    }

    #[test]
    fn test_results_render_below_statements() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "a\nb\n").unwrap();
        notebook.calculate(&mut Echo).unwrap();

        assert_eq!(notebook.buffer_text(), "a\na\nb\nb\n");
        assert_eq!(notebook.text(), "a\nb\n");
        assert_eq!(
            layout(&notebook),
            vec![
                (ChunkType::Statement, 0, 0),
                (ChunkType::Result, 1, 1),
                (ChunkType::Statement, 2, 2),
                (ChunkType::Result, 3, 3),
                (ChunkType::Blank, 4, 4),
            ]
        );
        let result = notebook.chunk_at(1).unwrap();
        let ChunkKind::Result(block) = result.kind() else {
            panic!("expected a result chunk");
        };
        assert_eq!(block.owner(), notebook.chunk_at(0).unwrap().id());
        assert!(!block.is_error);
    }

    #[test]
    fn test_syntax_error_renders_error_result() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "!x").unwrap();
        let report = notebook.calculate(&mut Echo).unwrap();

        assert_eq!(report.first_error, Some(notebook.chunk_at(0).unwrap().id()));
        assert_eq!(notebook.buffer_text(), "!x\nbad statement");
        let ChunkKind::Result(block) = notebook.chunk_at(1).unwrap().kind() else {
            panic!("expected a result chunk");
        };
        assert!(block.is_error);
    }

    #[test]
    fn test_newline_after_statement_moves_result_down_with_it() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "a\n").unwrap();
        notebook.calculate(&mut Echo).unwrap();

        let cursor = notebook.insert(0, 1, "\n").unwrap();
        assert_eq!(notebook.buffer_text(), "a\na\n\n");
        assert_eq!(
            layout(&notebook),
            vec![
                (ChunkType::Statement, 0, 0),
                (ChunkType::Result, 1, 1),
                (ChunkType::Blank, 2, 3),
            ]
        );
        assert_eq!(cursor, Position::new(2, 0));
    }

    #[test]
    fn test_continuation_after_result_absorbs_it() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "a\n").unwrap();
        notebook.calculate(&mut Echo).unwrap();

        // Line 2 is the blank line below the result.
        notebook.insert(2, 0, "  b").unwrap();
        assert_eq!(notebook.text(), "a\n  b");
        assert_eq!(
            layout(&notebook),
            vec![(ChunkType::Statement, 0, 1), (ChunkType::Result, 2, 2)]
        );
        assert_eq!(
            notebook.chunk_at(0).unwrap().as_statement().unwrap().text(),
            "a\n  b"
        );
        assert_eq!(notebook.line_text(2).as_deref(), Some("a"));
    }

    #[test]
    fn test_editing_result_text_is_refused() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "a\n").unwrap();
        notebook.calculate(&mut Echo).unwrap();

        assert!(notebook.insert(1, 0, "x").is_err());
        assert!(notebook.delete(1, 0, 1, 1).is_err());
        assert_eq!(notebook.buffer_text(), "a\na\n");
    }

    #[test]
    fn test_recalculate_replaces_result() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "a").unwrap();
        notebook.calculate(&mut Echo).unwrap();
        notebook.insert(0, 1, "b").unwrap();
        assert_eq!(notebook.buffer_text(), "ab\na");

        notebook.calculate(&mut Echo).unwrap();
        assert_eq!(notebook.buffer_text(), "ab\nab");
    }
}
