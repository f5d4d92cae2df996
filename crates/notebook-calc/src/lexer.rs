//! Lexer for calculator statements, built on logos.
//!
//! Newlines are plain whitespace here: a statement that reached the backend is already one
//! logical unit, whether it was continued by indentation or by a trailing backslash.

use crate::error::CalcError;
use logos::Logos;
use std::ops::Range;

/// Raw token from logos.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    /// Backslash line continuation; trivia, dropped by `lex`.
    #[regex(r"\\[ \t\r]*\n")]
    LineContinuation,
    /// Comment to the end of the line; trivia, dropped by `lex`.
    #[regex(r"#[^\n]*")]
    Comment,

    /// Integer literal.
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    /// Identifier.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// `=`
    #[token("=")]
    Assign,
    /// `+`
    #[token("+")]
    Plus,
    /// `-`
    #[token("-")]
    Minus,
    /// `*`
    #[token("*")]
    Star,
    /// `/`
    #[token("/")]
    Slash,
    /// `%`
    #[token("%")]
    Percent,
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `,`
    #[token(",")]
    Comma,
}

/// A token with its byte span in the statement source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// Byte range in the source.
    pub span: Range<usize>,
}

/// Tokenize one statement.
pub fn lex(source: &str) -> Result<Vec<Spanned>, CalcError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(Token::LineContinuation | Token::Comment) => continue,
            Ok(token) => tokens.push(Spanned { token, span }),
            Err(()) => {
                let (line, offset) = locate(source, span.start);
                let slice = lexer.slice();
                return Err(if slice.bytes().all(|b| b.is_ascii_digit()) {
                    CalcError::IntegerTooLarge { line, offset }
                } else {
                    CalcError::InvalidCharacter {
                        found: slice.to_string(),
                        line,
                        offset,
                    }
                });
            }
        }
    }

    Ok(tokens)
}

/// 1-based line and 0-based character offset of a byte position.
pub fn locate(source: &str, byte: usize) -> (usize, usize) {
    let before = &source[..byte.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |index| index + 1);
    (line, before[line_start..].chars().count())
}
