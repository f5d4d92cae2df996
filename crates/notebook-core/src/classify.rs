//! Line classification.
//!
//! Chunking is driven purely by line patterns, never by a grammar. A line is tested in this order:
//! blank, comment, continuation, and otherwise it starts a new statement.

use regex::Regex;
use std::sync::LazyLock;

static BLANK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*$").expect("valid regex"));
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*#").expect("valid regex"));
static CONTINUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+").expect("valid regex"));

/// The class of a single source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Only whitespace.
    Blank,
    /// First non-whitespace character is `#`.
    Comment,
    /// Starts with whitespace and is neither blank nor a comment.
    Continuation,
    /// Anything else: the first line of a statement.
    Head,
}

impl LineClass {
    /// Classify one line (without its trailing newline).
    pub fn of(line: &str) -> Self {
        if BLANK.is_match(line) {
            Self::Blank
        } else if COMMENT.is_match(line) {
            Self::Comment
        } else if CONTINUATION.is_match(line) {
            Self::Continuation
        } else {
            Self::Head
        }
    }

    /// Whether a line of this class can only be placed by looking at the lines above it.
    pub fn is_ambiguous(self) -> bool {
        !matches!(self, Self::Head)
    }
}
