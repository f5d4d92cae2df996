//! Error types.

use notebook_core::SyntaxError;
use thiserror::Error;

/// A lexing or parsing failure. Lines are 1-based, offsets 0-based characters, both relative to
/// the statement source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("invalid character '{found}'")]
    /// Input the lexer has no token for.
    InvalidCharacter {
        /// The offending text.
        found: String,
        /// Line.
        line: usize,
        /// Offset.
        offset: usize,
    },

    #[error("integer literal too large")]
    /// An integer literal that does not fit in 64 bits.
    IntegerTooLarge {
        /// Line.
        line: usize,
        /// Offset.
        offset: usize,
    },

    #[error("unexpected {found}, expected {expected}")]
    /// A token that does not fit the grammar at this point.
    UnexpectedToken {
        /// Description of the token found.
        found: String,
        /// What the parser was looking for.
        expected: &'static str,
        /// Line.
        line: usize,
        /// Offset.
        offset: usize,
    },

    #[error("unexpected end of statement, expected {expected}")]
    /// The statement ended early.
    UnexpectedEnd {
        /// What the parser was looking for.
        expected: &'static str,
        /// Line.
        line: usize,
        /// Offset.
        offset: usize,
    },
}

impl CalcError {
    /// Line and offset of the failure.
    pub fn location(&self) -> (usize, usize) {
        match self {
            Self::InvalidCharacter { line, offset, .. }
            | Self::IntegerTooLarge { line, offset }
            | Self::UnexpectedToken { line, offset, .. }
            | Self::UnexpectedEnd { line, offset, .. } => (*line, *offset),
        }
    }
}

impl From<CalcError> for SyntaxError {
    fn from(err: CalcError) -> Self {
        let (line, offset) = err.location();
        SyntaxError::new(format!("SyntaxError: {err}"), line, Some(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_syntax_error() {
        let err: SyntaxError = CalcError::UnexpectedEnd {
            expected: "expression",
            line: 1,
            offset: 3,
        }
        .into();
        assert_eq!(
            err.message,
            "SyntaxError: unexpected end of statement, expected expression"
        );
        assert_eq!(err.line, 1);
        assert_eq!(err.offset, Some(3));
    }
}
