//! Chunk data model.
//!
//! A [`Chunk`] is a contiguous, inclusive line range tagged with a closed set of variants
//! ([`ChunkKind`]). Statement chunks carry their compile/execute bookkeeping in [`Statement`].

use crate::error::{ExecutionError, SyntaxError};
use crate::execution::{CompiledStatement, ExecutionBackend, ExecutionContext, ResultValue};
use crate::NotebookError;
use std::ops::RangeInclusive;

/// Stable identifier of a chunk.
///
/// A statement keeps its id across edits that leave its text unchanged; that is how the
/// execution driver knows an unchanged statement is not dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub(crate) u64);

impl ChunkId {
    /// Raw numeric value (for logging / external maps).
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A classified line range of the buffer.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub(crate) id: ChunkId,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) nr_start: usize,
    pub(crate) kind: ChunkKind,
}

/// Chunk variants.
#[derive(Debug, Clone)]
pub enum ChunkKind {
    /// A maximal run of whitespace-only lines.
    Blank,
    /// A maximal run of comment lines.
    Comment,
    /// One logical source statement.
    Statement(Statement),
    /// Rendered output of the statement directly above.
    Result(ResultBlock),
}

/// Rendering metadata of a result chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultBlock {
    /// Whether the chunk renders an error diagnostic rather than results.
    pub is_error: bool,
    pub(crate) owner: ChunkId,
}

impl ResultBlock {
    /// The statement chunk that produced this output.
    pub fn owner(&self) -> ChunkId {
        self.owner
    }
}

impl Chunk {
    pub(crate) fn new(id: ChunkId, start: usize, end: usize, kind: ChunkKind) -> Self {
        Self {
            id,
            start,
            end,
            nr_start: 0,
            kind,
        }
    }

    /// Chunk identifier.
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// First line (inclusive).
    pub fn start(&self) -> usize {
        self.start
    }

    /// Last line (inclusive).
    pub fn end(&self) -> usize {
        self.end
    }

    /// Line range covered by this chunk.
    pub fn lines(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.end + 1 - self.start
    }

    /// Source-logical line number of the first line: the count of non-result lines before it.
    pub fn nr_start(&self) -> usize {
        self.nr_start
    }

    /// Variant and payload.
    pub fn kind(&self) -> &ChunkKind {
        &self.kind
    }

    /// Variant tag without payload.
    pub fn chunk_type(&self) -> ChunkType {
        match self.kind {
            ChunkKind::Blank => ChunkType::Blank,
            ChunkKind::Comment => ChunkType::Comment,
            ChunkKind::Statement(_) => ChunkType::Statement,
            ChunkKind::Result(_) => ChunkType::Result,
        }
    }

    /// Whether this is a result chunk.
    pub fn is_result(&self) -> bool {
        matches!(self.kind, ChunkKind::Result(_))
    }

    /// Statement payload, if this is a statement chunk.
    pub fn as_statement(&self) -> Option<&Statement> {
        match &self.kind {
            ChunkKind::Statement(statement) => Some(statement),
            _ => None,
        }
    }

    pub(crate) fn as_statement_mut(&mut self) -> Option<&mut Statement> {
        match &mut self.kind {
            ChunkKind::Statement(statement) => Some(statement),
            _ => None,
        }
    }

    /// Number of lines this chunk contributes to source-logical numbering.
    pub(crate) fn source_line_count(&self) -> usize {
        if self.is_result() { 0 } else { self.line_count() }
    }
}

/// Variant tag of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkType {
    /// [`ChunkKind::Blank`]
    Blank,
    /// [`ChunkKind::Comment`]
    Comment,
    /// [`ChunkKind::Statement`]
    Statement,
    /// [`ChunkKind::Result`]
    Result,
}

/// Lifecycle state of a statement, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Nothing pending and nothing compiled.
    Clean,
    /// Source changed since the last compile.
    NeedsCompile,
    /// Compiled and not scheduled for execution.
    Compiled,
    /// Compiled and waiting to be (re-)executed.
    NeedsExecute,
    /// Executed with the current source.
    Executed,
    /// The last compile or execute attempt failed.
    Error,
}

/// Diagnostic recorded on a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementError {
    /// Compilation failed.
    Syntax(SyntaxError),
    /// Execution failed.
    Execution(ExecutionError),
}

impl StatementError {
    /// Message rendered into the error result chunk.
    pub fn message(&self) -> &str {
        match self {
            Self::Syntax(err) => &err.message,
            Self::Execution(err) => &err.message,
        }
    }

    /// Line within the statement source, if known.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Syntax(err) => Some(err.line),
            Self::Execution(err) => err.line,
        }
    }

    /// Offset within that line (syntax errors only).
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Syntax(err) => err.offset,
            Self::Execution(_) => None,
        }
    }
}

/// Payload of a statement chunk.
#[derive(Debug, Clone)]
pub struct Statement {
    text: String,
    needs_compile: bool,
    needs_execute: bool,
    compiled: Option<CompiledStatement>,
    context: Option<ExecutionContext>,
    results: Option<Vec<ResultValue>>,
    error: Option<StatementError>,
}

impl Statement {
    pub(crate) fn new(text: String) -> Self {
        Self {
            text,
            needs_compile: true,
            needs_execute: false,
            compiled: None,
            context: None,
            results: None,
            error: None,
        }
    }

    /// Source text (lines joined with `'\n'`).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the source changed since the last compile.
    pub fn needs_compile(&self) -> bool {
        self.needs_compile
    }

    /// Whether the statement is scheduled for (re-)execution.
    pub fn needs_execute(&self) -> bool {
        self.needs_execute
    }

    /// Whether a compiled handle is held.
    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Results of the last successful execution.
    pub fn results(&self) -> Option<&[ResultValue]> {
        self.results.as_deref()
    }

    /// Diagnostic of the last failed compile/execute.
    pub fn error(&self) -> Option<&StatementError> {
        self.error.as_ref()
    }

    /// Context produced by the last successful execution.
    pub fn context(&self) -> Option<&ExecutionContext> {
        self.context.as_ref()
    }

    /// Derived lifecycle state.
    pub fn state(&self) -> StatementState {
        if self.needs_compile {
            StatementState::NeedsCompile
        } else if self.error.is_some() {
            StatementState::Error
        } else if self.needs_execute {
            StatementState::NeedsExecute
        } else if self.context.is_some() {
            StatementState::Executed
        } else if self.compiled.is_some() {
            StatementState::Compiled
        } else {
            StatementState::Clean
        }
    }

    /// Whether a result chunk should be shown for this statement.
    pub(crate) fn has_output(&self) -> bool {
        self.error.is_some() || self.results.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Replace the source text. Returns `false` (and changes nothing) if it is identical.
    ///
    /// Results and diagnostics survive until the next compile so the stale output stays visible.
    pub(crate) fn set_text(&mut self, text: String) -> bool {
        if text == self.text {
            return false;
        }
        self.text = text;
        self.needs_compile = true;
        self.needs_execute = false;
        self.compiled = None;
        self.context = None;
        true
    }

    /// Schedule for execution. Only compiled statements can be scheduled.
    pub(crate) fn mark_for_execute(&mut self) {
        if self.compiled.is_some() {
            self.needs_execute = true;
        }
    }

    pub(crate) fn compile<B: ExecutionBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.compiled.is_some() {
            return;
        }
        self.needs_compile = false;
        self.results = None;
        self.error = None;

        match backend.compile(&self.text) {
            Ok(compiled) => {
                self.compiled = Some(compiled);
                self.needs_execute = true;
            }
            Err(err) => {
                tracing::debug!(
                    message = %err.message,
                    line = err.line,
                    "statement failed to compile"
                );
                self.error = Some(StatementError::Syntax(err));
            }
        }
    }

    pub(crate) fn execute<B: ExecutionBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        parent: Option<&ExecutionContext>,
    ) -> Result<(), NotebookError> {
        let compiled = self
            .compiled
            .as_ref()
            .ok_or_else(|| {
                NotebookError::invariant("executing a statement that was never compiled")
            })?;

        self.needs_compile = false;
        self.needs_execute = false;
        self.error = None;

        match backend.execute(compiled, parent) {
            Ok(context) => {
                self.results = Some(context.results().to_vec());
                self.context = Some(context);
            }
            Err(err) => {
                tracing::debug!(message = %err.message, "statement failed to execute");
                self.results = None;
                self.context = None;
                self.error = Some(StatementError::Execution(err));
            }
        }
        Ok(())
    }
}
