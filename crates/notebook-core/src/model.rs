//! Chunk model: the partition of buffer lines into chunks.
//!
//! Every line has a slot naming the chunk it belongs to, plus the source text the engine last
//! classified for it (`None` for result lines). Chunks themselves live in an arena keyed by
//! [`ChunkId`]. While an edit is being processed, slots may be temporarily unresolved (`None`)
//! and chunk ranges may overlap; [`ChunkModel::iter`] skips unresolved slots, and
//! [`ChunkModel::validate`] checks that a completed operation left none of that behind.

use crate::chunk::{Chunk, ChunkId, ChunkKind};
use crate::error::NotebookError;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Default)]
pub(crate) struct LineSlot {
    pub(crate) chunk: Option<ChunkId>,
    pub(crate) text: Option<String>,
}

/// Lines, chunks and the mapping between them.
#[derive(Debug, Clone)]
pub struct ChunkModel {
    pub(crate) slots: Vec<LineSlot>,
    pub(crate) chunks: FxHashMap<ChunkId, Chunk>,
    next_id: u64,
}

impl ChunkModel {
    /// A model for the empty document: one blank line.
    pub fn new() -> Self {
        let mut model = Self {
            slots: Vec::new(),
            chunks: FxHashMap::default(),
            next_id: 0,
        };
        let id = model.alloc(0, 0, ChunkKind::Blank);
        model.slots.push(LineSlot {
            chunk: Some(id),
            text: Some(String::new()),
        });
        model
    }

    /// Number of lines (source and result).
    pub fn line_count(&self) -> usize {
        self.slots.len()
    }

    /// Chunk containing `line`.
    pub fn chunk_at(&self, line: usize) -> Option<&Chunk> {
        let id = self.slots.get(line)?.chunk?;
        self.chunks.get(&id)
    }

    /// Chunk by id.
    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(&id)
    }

    pub(crate) fn chunk_mut(&mut self, id: ChunkId) -> Option<&mut Chunk> {
        self.chunks.get_mut(&id)
    }

    pub(crate) fn slot_chunk(&self, line: usize) -> Option<ChunkId> {
        self.slots.get(line).and_then(|slot| slot.chunk)
    }

    /// Variant stored at a line slot, if resolved.
    pub(crate) fn kind_at(&self, line: usize) -> Option<&ChunkKind> {
        self.chunk_at(line).map(|chunk| &chunk.kind)
    }

    pub(crate) fn is_result_line(&self, line: usize) -> bool {
        matches!(self.kind_at(line), Some(ChunkKind::Result(_)))
    }

    /// Every chunk, in line order.
    pub fn iter(&self) -> ChunkIter<'_> {
        self.iter_range(0, usize::MAX)
    }

    /// Every chunk intersecting `from..=to`, in line order, each exactly once.
    pub fn iter_range(&self, from: usize, to: usize) -> ChunkIter<'_> {
        let last = to.min(self.slots.len().saturating_sub(1));
        ChunkIter {
            model: self,
            line: from,
            last,
            previous: None,
        }
    }

    pub(crate) fn alloc(&mut self, start: usize, end: usize, kind: ChunkKind) -> ChunkId {
        let id = ChunkId(self.next_id);
        self.next_id += 1;
        self.chunks.insert(id, Chunk::new(id, start, end, kind));
        id
    }

    /// Whether every line in the chunk's range still points at it.
    pub(crate) fn owns_all(&self, chunk: &Chunk) -> bool {
        chunk.start <= chunk.end
            && chunk.end < self.slots.len()
            && self.slots[chunk.start..=chunk.end]
                .iter()
                .all(|slot| slot.chunk == Some(chunk.id))
    }

    /// Whether the chunk still occupies its first line.
    pub(crate) fn is_alive(&self, id: ChunkId) -> bool {
        self.chunk(id)
            .is_some_and(|chunk| self.slot_chunk(chunk.start) == Some(id))
    }

    /// Assign the slots `start..=end` to chunk `id`.
    pub(crate) fn claim(&mut self, id: ChunkId, start: usize, end: usize) {
        for slot in &mut self.slots[start..=end] {
            slot.chunk = Some(id);
        }
    }

    /// Source-logical line number of a chunk starting at `start`, by the inheritance rule.
    ///
    /// Uses the chunk ending just before `start`: a result chunk passes its own `nr_start`
    /// through, any other chunk adds its line count.
    pub(crate) fn nr_start_for(&self, start: usize) -> usize {
        if start == 0 {
            return 0;
        }
        match self.chunk_at(start - 1) {
            Some(previous) if previous.is_result() => previous.nr_start,
            Some(previous) => previous.nr_start + (start - previous.start),
            None => 0,
        }
    }

    pub(crate) fn compute_nr_start(&mut self, id: ChunkId) {
        let Some(start) = self.chunk(id).map(|chunk| chunk.start) else {
            return;
        };
        let nr_start = self.nr_start_for(start);
        if let Some(chunk) = self.chunk_mut(id) {
            chunk.nr_start = nr_start;
        }
    }

    /// Recompute `nr_start` for the chunk containing `line` and every chunk after it.
    ///
    /// Chunks entirely above `line` are trusted.
    pub(crate) fn renumber_from(&mut self, line: usize) {
        if self.slots.is_empty() {
            return;
        }
        let mut line = line.min(self.slots.len() - 1);
        let first = self.slots[line].chunk;
        while line > 0 && first.is_some() && self.slots[line - 1].chunk == first {
            line -= 1;
        }

        let mut counter = self.nr_start_for(line);
        let mut previous = None;
        for index in line..self.slots.len() {
            let Some(id) = self.slots[index].chunk else {
                continue;
            };
            let Some(chunk) = self.chunks.get_mut(&id) else {
                continue;
            };
            if previous != Some(id) {
                chunk.nr_start = counter;
                previous = Some(id);
            }
            if !chunk.is_result() {
                counter += 1;
            }
        }
    }

    /// Insert `count` slots before `at`.
    pub(crate) fn insert_slots(&mut self, at: usize, count: usize, chunk: Option<ChunkId>) {
        self.slots.splice(
            at..at,
            (0..count).map(|_| LineSlot { chunk, text: None }),
        );
    }

    /// Remove the slots `first..=last`.
    pub(crate) fn remove_slots(&mut self, first: usize, last: usize) {
        self.slots.drain(first..=last);
    }

    /// Drop chunks no slot refers to any more.
    pub(crate) fn collect_garbage(&mut self) {
        let live: FxHashSet<ChunkId> = self.slots.iter().filter_map(|slot| slot.chunk).collect();
        self.chunks.retain(|id, _| live.contains(id));
    }

    /// Check every document invariant. Only meaningful between operations.
    pub fn validate(&self) -> Result<(), NotebookError> {
        let mut seen: FxHashSet<ChunkId> = FxHashSet::default();
        let mut previous: Option<&Chunk> = None;
        let mut nr = 0usize;
        let mut line = 0usize;

        while line < self.slots.len() {
            let id = self.slots[line]
                .chunk
                .ok_or_else(|| NotebookError::invariant(format!("line {line} is unresolved")))?;
            let chunk = self
                .chunks
                .get(&id)
                .ok_or_else(|| {
                    NotebookError::invariant(format!("line {line} names a dropped chunk"))
                })?;
            if !seen.insert(id) {
                return Err(NotebookError::invariant(format!(
                    "chunk {id:?} covers non-contiguous lines"
                )));
            }
            if chunk.start != line || chunk.end < chunk.start {
                return Err(NotebookError::invariant(format!(
                    "chunk {id:?} claims {}..={} but starts at line {line}",
                    chunk.start, chunk.end
                )));
            }
            if chunk.end >= self.slots.len()
                || self.slots[line..=chunk.end]
                    .iter()
                    .any(|slot| slot.chunk != Some(id))
            {
                return Err(NotebookError::invariant(format!(
                    "chunk {id:?} range {}..={} disagrees with its line slots",
                    chunk.start, chunk.end
                )));
            }
            if chunk.nr_start != nr {
                return Err(NotebookError::invariant(format!(
                    "chunk {id:?} has nr_start {} but {nr} source lines precede it",
                    chunk.nr_start
                )));
            }

            match (&chunk.kind, previous.map(|p| &p.kind)) {
                (ChunkKind::Blank, Some(ChunkKind::Blank))
                | (ChunkKind::Comment, Some(ChunkKind::Comment)) => {
                    return Err(NotebookError::invariant(format!(
                        "chunk {id:?} is not a maximal run"
                    )));
                }
                (ChunkKind::Result(block), Some(ChunkKind::Statement(statement)))
                    if statement.has_output() && previous.is_some_and(|p| p.id == block.owner) => {}
                (ChunkKind::Result(_), _) => {
                    return Err(NotebookError::invariant(format!(
                        "result chunk {id:?} has no corresponding statement"
                    )));
                }
                (ChunkKind::Statement(statement), _)
                    if statement.needs_execute()
                        && !statement.needs_compile()
                        && !statement.is_compiled() =>
                {
                    return Err(NotebookError::invariant(format!(
                        "statement {id:?} scheduled for execution without a compiled handle"
                    )));
                }
                _ => {}
            }

            nr += chunk.source_line_count();
            previous = Some(chunk);
            line = chunk.end + 1;
        }

        if seen.len() != self.chunks.len() {
            return Err(NotebookError::invariant("unreferenced chunks remain"));
        }
        Ok(())
    }
}

impl Default for ChunkModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over chunks in line order.
pub struct ChunkIter<'a> {
    model: &'a ChunkModel,
    line: usize,
    last: usize,
    previous: Option<ChunkId>,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = &'a Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        while self.line <= self.last && self.line < self.model.slots.len() {
            let slot = self.model.slots[self.line].chunk;
            self.line += 1;
            let Some(id) = slot else {
                continue;
            };
            if self.previous == Some(id) {
                continue;
            }
            self.previous = Some(id);
            if let Some(chunk) = self.model.chunks.get(&id) {
                return Some(chunk);
            }
        }
        None
    }
}
