//! Rescan engine: reclassifies a window of lines after an edit.
//!
//! The window handed in covers the lines whose text changed. It is first widened until both edges
//! sit on stable boundaries:
//! - backwards while the first line is ambiguous (blank, comment, continuation, or not yet
//!   classified), since such a line can only be placed by looking above it;
//! - forwards while a statement straddles the end, or a continuation line follows the window
//!   across nothing but blank, comment and result lines.
//!
//! Lines are then grouped into runs, each run starting at a statement head. A statement keeps its
//! identity when an existing statement inside the window can donate it; result lines are left in
//! place and sorted out afterwards by the result synchronizer.

use crate::chunk::{ChunkId, ChunkKind, Statement};
use crate::classify::LineClass;
use crate::error::NotebookError;
use crate::notebook::Notebook;
use rustc_hash::FxHashSet;
use std::ops::Range;

/// One line of a run: its index and its new text (`None` for a result line).
type RunLine = (usize, Option<String>);

struct Pass {
    window: Range<usize>,
    assigned: FxHashSet<ChunkId>,
    first_changed: Option<usize>,
}

impl Pass {
    fn changed_at(&mut self, line: usize) {
        self.first_changed = Some(self.first_changed.map_or(line, |first| first.min(line)));
    }
}

impl Notebook {
    /// Reclassify `start..end` (widened as needed). Returns the window that was rescanned.
    pub(crate) fn rescan(
        &mut self,
        start: usize,
        end: usize,
        entire_statements_deleted: bool,
    ) -> Result<Range<usize>, NotebookError> {
        let line_count = self.model.line_count();
        let mut rescan_end = end.min(line_count);
        let mut rescan_start = start.min(rescan_end);

        while rescan_end < line_count
            && let Some(line) = self.continuation_after(rescan_end)
        {
            rescan_end = match self.model.chunk_at(line) {
                Some(chunk) if chunk.as_statement().is_some() && chunk.end >= line => {
                    (chunk.end + 1).min(line_count)
                }
                _ => line + 1,
            };
        }
        while rescan_start > 0
            && (rescan_start >= line_count || self.is_ambiguous_line(rescan_start))
        {
            rescan_start -= 1;
        }

        tracing::trace!(start, end, rescan_start, rescan_end, "rescan window");

        let mut pass = Pass {
            window: rescan_start..rescan_end,
            assigned: FxHashSet::default(),
            first_changed: None,
        };

        let mut run: Vec<RunLine> = Vec::new();
        let mut statement_end: Option<usize> = None;
        for line in rescan_start..rescan_end {
            let text = self.new_text(line);
            let class = text.as_deref().map(LineClass::of);
            match class {
                None | Some(LineClass::Blank) | Some(LineClass::Comment) => run.push((line, text)),
                Some(LineClass::Continuation) if statement_end.is_some() => {
                    run.push((line, text));
                    statement_end = Some(line);
                }
                Some(LineClass::Continuation) | Some(LineClass::Head) => {
                    self.assign_lines(&run, statement_end, &mut pass)?;
                    run.clear();
                    run.push((line, text));
                    statement_end = Some(line);
                }
            }
        }
        self.assign_lines(&run, statement_end, &mut pass)?;

        if rescan_end > rescan_start {
            self.repair_seam(rescan_end);
        }

        if let Some(line) = pass.first_changed {
            self.mark_rest_for_execute(line);
        } else if entire_statements_deleted {
            self.mark_rest_for_execute(end.min(self.model.line_count()));
        }

        Ok(rescan_start..rescan_end)
    }

    /// Text of `line` as it is now; `None` for result lines.
    fn new_text(&self, line: usize) -> Option<String> {
        if self.model.is_result_line(line) {
            None
        } else {
            self.text.line_text(line)
        }
    }

    fn is_ambiguous_line(&self, line: usize) -> bool {
        let ambiguous =
            |text: Option<&str>| text.is_none_or(|text| LineClass::of(text).is_ambiguous());
        let old = self.model.slots.get(line).and_then(|slot| slot.text.as_deref());
        ambiguous(old) || ambiguous(self.new_text(line).as_deref())
    }

    /// The line at or past `line` that must join a window ending just before `line`.
    ///
    /// That is `line` itself when a statement straddles the window edge, or else the first
    /// continuation line (old or new text) reached over blank, comment and result lines only: the
    /// statement it belongs to may now be continued by a head inside the window.
    fn continuation_after(&self, line: usize) -> Option<usize> {
        if let Some(chunk) = self.model.chunk_at(line)
            && chunk.as_statement().is_some()
            && chunk.start < line
        {
            return Some(line);
        }
        for next in line..self.model.line_count() {
            let old = self.model.slots[next].text.as_deref().map(LineClass::of);
            let new = self.new_text(next).as_deref().map(LineClass::of);
            match (old, new) {
                (Some(LineClass::Continuation), _) | (_, Some(LineClass::Continuation)) => {
                    return Some(next);
                }
                (Some(LineClass::Head), _) | (_, Some(LineClass::Head)) => return None,
                _ => {}
            }
        }
        None
    }

    /// Turn one run into chunks: a statement up to `statement_end` (if any), then blank and
    /// comment chunks for the trailing lines.
    fn assign_lines(
        &mut self,
        run: &[RunLine],
        statement_end: Option<usize>,
        pass: &mut Pass,
    ) -> Result<(), NotebookError> {
        let Some(&(run_start, _)) = run.first() else {
            return Ok(());
        };

        let trailing = match statement_end {
            Some(statement_end) => {
                let split = statement_end + 1 - run_start;
                self.assign_statement(&run[..split], pass)?;
                &run[split..]
            }
            None => run,
        };

        for (line, text) in trailing {
            let Some(text) = text else {
                continue;
            };
            let kind = match LineClass::of(text) {
                LineClass::Comment => ChunkKind::Comment,
                _ => ChunkKind::Blank,
            };
            let line = *line;

            let extend = (line > pass.window.start)
                .then(|| self.model.slot_chunk(line - 1))
                .flatten()
                .filter(|id| pass.assigned.contains(id))
                .filter(|id| {
                    self.model.chunk(*id).is_some_and(|chunk| {
                        matches!(
                            (&chunk.kind, &kind),
                            (ChunkKind::Blank, ChunkKind::Blank)
                                | (ChunkKind::Comment, ChunkKind::Comment)
                        )
                    })
                });

            let id = match extend {
                Some(id) => {
                    if let Some(chunk) = self.model.chunk_mut(id) {
                        chunk.end = line;
                    }
                    id
                }
                None => {
                    let id = match self.reusable_run(line, &kind, pass) {
                        Some(id) => {
                            if let Some(chunk) = self.model.chunk_mut(id) {
                                chunk.start = line;
                                chunk.end = line;
                            }
                            id
                        }
                        None => self.model.alloc(line, line, kind),
                    };
                    pass.assigned.insert(id);
                    id
                }
            };
            self.model.claim(id, line, line);
            self.model.slots[line].text = Some(text.clone());
        }
        Ok(())
    }

    /// The blank/comment chunk currently at `line`, if it can be taken over.
    fn reusable_run(&self, line: usize, kind: &ChunkKind, pass: &Pass) -> Option<ChunkId> {
        let id = self.model.slot_chunk(line)?;
        let chunk = self.model.chunk(id)?;
        let same_kind = matches!(
            (&chunk.kind, kind),
            (ChunkKind::Blank, ChunkKind::Blank) | (ChunkKind::Comment, ChunkKind::Comment)
        );
        (same_kind
            && !pass.assigned.contains(&id)
            && chunk.start >= pass.window.start
            && chunk.end < pass.window.end)
            .then_some(id)
    }

    fn assign_statement(
        &mut self,
        lines: &[RunLine],
        pass: &mut Pass,
    ) -> Result<(), NotebookError> {
        let (Some(&(start, _)), Some(&(end, _))) = (lines.first(), lines.last()) else {
            return Ok(());
        };
        let text = lines
            .iter()
            .filter_map(|(_, text)| text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        let donor = (start..=end)
            .filter_map(|line| self.model.slot_chunk(line))
            .find(|id| {
                !pass.assigned.contains(id)
                    && self.model.chunk(*id).is_some_and(|chunk| {
                        chunk.as_statement().is_some()
                            && chunk.start >= pass.window.start
                            && chunk.end < pass.window.end
                    })
            });

        let id = match donor {
            Some(id) => {
                let (old_start, old_end) = self
                    .model
                    .chunk(id)
                    .map(|chunk| (chunk.start, chunk.end))
                    .ok_or_else(|| NotebookError::invariant("donor statement vanished"))?;
                for slot in &mut self.model.slots[old_start..=old_end] {
                    if slot.chunk == Some(id) {
                        slot.chunk = None;
                    }
                }
                if self.statement_mut(id)?.set_text(text) {
                    pass.changed_at(start);
                }
                id
            }
            None => {
                pass.changed_at(start);
                self.model
                    .alloc(start, end, ChunkKind::Statement(Statement::new(text)))
            }
        };

        if let Some(chunk) = self.model.chunk_mut(id) {
            chunk.start = start;
            chunk.end = end;
        }
        self.model.claim(id, start, end);
        for (line, text) in lines {
            self.model.slots[*line].text = text.clone();
        }
        pass.assigned.insert(id);
        Ok(())
    }

    /// Fix up the chunk straddling the end of the window.
    fn repair_seam(&mut self, rescan_end: usize) {
        let Some(next) = self.model.slot_chunk(rescan_end) else {
            return;
        };
        if let Some(chunk) = self.model.chunk_mut(next)
            && chunk.start < rescan_end
        {
            chunk.start = rescan_end;
        }

        let Some(last) = self.model.slot_chunk(rescan_end - 1) else {
            return;
        };
        if last == next {
            return;
        }
        let (Some(last_chunk), Some(next_chunk)) = (self.model.chunk(last), self.model.chunk(next))
        else {
            return;
        };
        let same_run = matches!(
            (&last_chunk.kind, &next_chunk.kind),
            (ChunkKind::Blank, ChunkKind::Blank) | (ChunkKind::Comment, ChunkKind::Comment)
        );
        if !same_run {
            return;
        }
        let next_end = next_chunk.end;
        if let Some(chunk) = self.model.chunk_mut(last) {
            chunk.end = next_end;
        }
        self.model.claim(last, rescan_end, next_end);
        self.model.chunks.remove(&next);
    }

    /// Schedule every compiled statement at or after `line` for re-execution.
    pub(crate) fn mark_rest_for_execute(&mut self, line: usize) {
        let statements: Vec<ChunkId> = self
            .model
            .iter_range(line, usize::MAX)
            .filter(|chunk| chunk.start >= line && chunk.as_statement().is_some())
            .map(|chunk| chunk.id)
            .collect();
        for id in statements {
            if let Some(statement) = self.model.chunk_mut(id).and_then(|c| c.as_statement_mut()) {
                statement.mark_for_execute();
            }
            self.notify_chunk(id);
            if let Some(result) = self.find_result(id) {
                self.notify_chunk(result);
            }
        }
    }
}
