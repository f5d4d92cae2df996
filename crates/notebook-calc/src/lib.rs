#![warn(missing_docs)]
//! Notebook Calc - a small calculator backend for `notebook-core`
//!
//! Implements [`ExecutionBackend`](notebook_core::ExecutionBackend) for an integer calculator
//! language: assignments, expression statements, `+ - * / %`, parentheses, unary minus, and a
//! few builtins. It drives the engine in tests, benches and the embedding example.
//!
//! ```rust
//! use notebook_calc::CalcBackend;
//! use notebook_core::Notebook;
//!
//! let mut notebook = Notebook::new();
//! notebook.insert(0, 0, "a = 20\na + 22\n").unwrap();
//! notebook.calculate(&mut CalcBackend::new()).unwrap();
//!
//! assert_eq!(notebook.buffer_text(), "a = 20\na + 22\n42\n");
//! assert_eq!(notebook.text(), "a = 20\na + 22\n");
//! ```

pub mod backend;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod scope;

pub use backend::{CalcBackend, Shown};
pub use error::CalcError;
pub use parser::{BinaryOp, Expr, Stmt, parse};
pub use scope::Scope;
