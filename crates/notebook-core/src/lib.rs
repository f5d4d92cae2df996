#![warn(missing_docs)]
//! Notebook Core - Headless Incremental Notebook Engine
//!
//! # Overview
//!
//! `notebook-core` keeps a text document classified into chunks (statements, comments, blank
//! runs, and the computed results of statements) while the document is edited one keystroke
//! at a time. It does not render anything and does not interpret code: an
//! [`ExecutionBackend`] compiles and executes statements, and the engine keeps the rendered
//! results in the buffer, directly below the statement that produced them.
//!
//! # Core Features
//!
//! - **Incremental classification**: each edit reclassifies only a small window of lines
//! - **Stable statement identity**: unchanged statements are never recompiled
//! - **Results in the buffer**: read-only result text that moves with its statement
//! - **Source-logical coordinates**: positions that ignore result lines, for undo and saving
//! - **Undo/redo**: coalesced typing, user-action grouping, clean point tracking
//! - **Atomic saves**: temp file plus rename, result text excluded
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Notebook API (edits, calculate, load/save) │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Undo/Redo Log     │  Execution Driver      │  ← History / Computation
//! ├─────────────────────────────────────────────┤
//! │  Result Synchronizer                        │  ← Result placement
//! ├─────────────────────────────────────────────┤
//! │  Rescan Engine                              │  ← Classification
//! ├─────────────────────────────────────────────┤
//! │  Chunk Model + Position Mapper              │  ← Line partition
//! ├─────────────────────────────────────────────┤
//! │  Line Index (Rope-based)                    │  ← Text storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use notebook_core::{ChunkType, Notebook};
//!
//! let mut notebook = Notebook::new();
//! notebook.insert(0, 0, "a = 1\n# double it\nb = a * 2\n").unwrap();
//!
//! let kinds: Vec<_> = notebook.chunks().map(|chunk| chunk.chunk_type()).collect();
//! assert_eq!(
//!     kinds,
//!     vec![
//!         ChunkType::Statement,
//!         ChunkType::Comment,
//!         ChunkType::Statement,
//!         ChunkType::Blank,
//!     ]
//! );
//!
//! notebook.undo().unwrap();
//! assert_eq!(notebook.text(), "");
//! ```
//!
//! # Module Description
//!
//! - [`classify`] - line classes (blank, comment, continuation, statement head)
//! - [`line_index`] - Rope based buffer text
//! - [`model`] - chunk partition of the buffer lines
//! - [`chunk`] - chunk variants and statement bookkeeping
//! - [`execution`] - backend contract and the calculate pass
//! - [`undo`] - undo/redo log
//! - [`events`] - change notifications

pub mod chunk;
pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod execution;
pub mod line_index;
pub mod model;
mod notebook;
mod persistence;
pub mod position;
mod rescan;
mod results;
pub mod undo;

pub use chunk::{
    Chunk, ChunkId, ChunkKind, ChunkType, ResultBlock, Statement, StatementError, StatementState,
};
pub use classify::LineClass;
pub use config::NotebookConfig;
pub use error::{ExecutionError, NotebookError, SyntaxError};
pub use events::{NotebookCallback, NotebookEvent};
pub use execution::{
    CalculateReport, CompiledStatement, ExecutionBackend, ExecutionContext, ResultValue,
    RichResult,
};
pub use line_index::LineIndex;
pub use model::{ChunkIter, ChunkModel};
pub use notebook::Notebook;
pub use position::{NrPosition, Position};
pub use undo::UndoOp;
