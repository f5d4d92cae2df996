//! Position mapper.
//!
//! Two coordinate systems address the buffer:
//! - [`Position`]: absolute `(line, offset)` over every line, result lines included.
//! - [`NrPosition`]: source-logical `(line, offset)` counting only non-result lines. It stays valid
//!   while result chunks are inserted and removed, which is why the undo log records in it.

use crate::error::NotebookError;
use crate::notebook::Notebook;
use std::cmp::Ordering;

/// Absolute buffer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based character offset within the line.
    pub offset: usize,
}

impl Position {
    /// Create a new position.
    pub fn new(line: usize, offset: usize) -> Self {
        Self { line, offset }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.offset.cmp(&other.offset))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Source-logical coordinates: result lines are not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NrPosition {
    /// Source-logical line.
    pub line: usize,
    /// Character offset within the line.
    pub offset: usize,
}

impl NrPosition {
    /// Create a new source-logical position.
    pub fn new(line: usize, offset: usize) -> Self {
        Self { line, offset }
    }
}

impl Notebook {
    /// Source-logical coordinates of an absolute position.
    ///
    /// A position on a result line maps onto the first source line after the result.
    pub fn nr_position(&self, position: Position) -> Result<NrPosition, NotebookError> {
        let chunk = self
            .model
            .chunk_at(position.line)
            .ok_or(NotebookError::InvalidPosition {
                line: position.line,
                offset: position.offset,
            })?;
        let line = if chunk.is_result() {
            chunk.nr_start
        } else {
            chunk.nr_start + (position.line - chunk.start)
        };
        Ok(NrPosition::new(line, position.offset))
    }

    /// Absolute coordinates of a source-logical position.
    pub fn position_from_nr(&self, nr: NrPosition) -> Result<Position, NotebookError> {
        let chunk = self
            .model
            .iter()
            .find(|chunk| !chunk.is_result() && chunk.nr_start + chunk.line_count() > nr.line)
            .ok_or_else(|| {
                NotebookError::invariant(format!(
                    "source-logical line {} lies outside the buffer",
                    nr.line
                ))
            })?;
        Ok(Position::new(chunk.start + (nr.line - chunk.nr_start), nr.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(0, 5) < Position::new(1, 0));
        assert!(Position::new(2, 1) < Position::new(2, 3));
        assert_eq!(Position::new(1, 1).max(Position::new(1, 0)), Position::new(1, 1));
    }

    #[test]
    fn test_nr_position_roundtrip_without_results() {
        let mut notebook = Notebook::new();
        notebook.insert(0, 0, "a\n\n# c\nb").unwrap();
        for line in 0..4 {
            let nr = notebook.nr_position(Position::new(line, 0)).unwrap();
            assert_eq!(nr, NrPosition::new(line, 0));
            assert_eq!(notebook.position_from_nr(nr).unwrap(), Position::new(line, 0));
        }
    }

    #[test]
    fn test_position_from_nr_past_end_is_invariant_error() {
        let notebook = Notebook::new();
        assert!(matches!(
            notebook.position_from_nr(NrPosition::new(3, 0)),
            Err(NotebookError::Invariant(_))
        ));
    }
}
