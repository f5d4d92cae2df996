//! Error types.
//!
//! Two families live here:
//! - [`NotebookError`]: failures of an engine operation (bad coordinates, I/O, broken invariants).
//! - [`SyntaxError`] / [`ExecutionError`]: diagnostics produced by an execution backend. These are
//!   not failures of the engine; they are stored on the statement and rendered as an error result.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by [`Notebook`](crate::Notebook) operations.
pub enum NotebookError {
    #[error("invalid position: line {line}, offset {offset}")]
    /// A line/offset pair does not address a location in the buffer.
    InvalidPosition {
        /// Line index.
        line: usize,
        /// Character offset within the line.
        offset: usize,
    },

    #[error("line {line} belongs to a computed result and cannot be edited")]
    /// An interactive edit targeted text that belongs to a result chunk.
    ReadOnlyResult {
        /// First line of the result text that was targeted.
        line: usize,
    },

    #[error("nothing to undo")]
    /// The undo history is empty.
    NothingToUndo,

    #[error("nothing to redo")]
    /// The redo history is empty.
    NothingToRedo,

    #[error("no current or specified filename")]
    /// `save` was called without a path on a notebook that was never loaded or saved.
    NoFilename,

    #[error("I/O error: {0}")]
    /// Filesystem I/O failed.
    Io(#[from] std::io::Error),

    #[error("failed to replace '{path}': {source}")]
    /// The final rename of a save failed; the previous file is untouched.
    Persist {
        /// Target path of the save.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not valid UTF-8")]
    /// A loaded file could not be decoded.
    InvalidUtf8 {
        /// Path of the rejected file.
        path: PathBuf,
    },

    #[error("internal invariant violated: {0}")]
    /// The chunk model reached a state that correct operation never produces.
    Invariant(String),
}

impl NotebookError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(%message, "notebook invariant violated");
        Self::Invariant(message)
    }
}

/// A compile-time diagnostic for one statement.
///
/// `line` and `offset` are relative to the statement's own source text (1-based line,
/// 0-based character offset), as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line}, offset {offset:?})")]
pub struct SyntaxError {
    /// Human-readable message.
    pub message: String,
    /// Line within the statement source.
    pub line: usize,
    /// Character offset within that line, if known.
    pub offset: Option<usize>,
}

impl SyntaxError {
    /// Create a new syntax error.
    pub fn new(message: impl Into<String>, line: usize, offset: Option<usize>) -> Self {
        Self {
            message: message.into(),
            line,
            offset,
        }
    }
}

/// A run-time failure while executing one statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecutionError {
    /// Formatted failure trace.
    pub message: String,
    /// Line within the statement source where execution failed, if known.
    pub line: Option<usize>,
}

impl ExecutionError {
    /// Create a new execution error.
    pub fn new(message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}
