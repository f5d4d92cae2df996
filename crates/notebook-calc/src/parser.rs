//! Recursive-descent parser.
//!
//! ```text
//! statement := IDENT '=' expr | expr
//! expr      := term (('+' | '-') term)*
//! term      := unary (('*' | '/' | '%') unary)*
//! unary     := '-' unary | primary
//! primary   := INT | IDENT | IDENT '(' (expr (',' expr)*)? ')' | '(' expr ')'
//! ```

use crate::error::CalcError;
use crate::lexer::{Spanned, Token, lex, locate};
use std::ops::Range;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/` (truncating)
    Div,
    /// `%`
    Rem,
}

/// Expression tree. Spans are byte ranges in the statement source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Integer literal.
    Int(i64),
    /// Variable reference.
    Name {
        /// Variable name.
        name: String,
        /// Source span.
        span: Range<usize>,
    },
    /// Unary minus.
    Neg(Box<Expr>),
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
        /// Span of the operator.
        span: Range<usize>,
    },
    /// Builtin call.
    Call {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
        /// Span of the function name.
        span: Range<usize>,
    },
}

/// One statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `name = value`
    Assign {
        /// Bound name.
        name: String,
        /// Value expression.
        value: Expr,
    },
    /// An expression whose value is the statement's result.
    Expr(Expr),
}

/// Parse one statement.
pub fn parse(source: &str) -> Result<Stmt, CalcError> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        source,
        tokens: &tokens,
        pos: 0,
    };
    let stmt = parser.statement()?;
    match parser.peek() {
        None => Ok(stmt),
        Some(next) => Err(parser.unexpected(next, "end of statement")),
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a Spanned> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().is_some_and(|next| next.token == *token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), CalcError> {
        match self.bump() {
            Some(next) if next.token == *token => Ok(()),
            Some(next) => Err(self.unexpected(next, expected)),
            None => Err(self.end(expected)),
        }
    }

    fn statement(&mut self) -> Result<Stmt, CalcError> {
        if let [
            Spanned {
                token: Token::Ident(name),
                ..
            },
            Spanned {
                token: Token::Assign,
                ..
            },
            ..,
        ] = &self.tokens[self.pos..]
        {
            self.pos += 2;
            let value = self.expr()?;
            return Ok(Stmt::Assign {
                name: name.clone(),
                value,
            });
        }
        Ok(Stmt::Expr(self.expr()?))
    }

    fn expr(&mut self) -> Result<Expr, CalcError> {
        let mut lhs = self.term()?;
        while let Some(next) = self.peek() {
            let op = match next.token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span: next.span.clone(),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, CalcError> {
        let mut lhs = self.unary()?;
        while let Some(next) = self.peek() {
            let op = match next.token {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span: next.span.clone(),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, CalcError> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, CalcError> {
        let Some(next) = self.bump() else {
            return Err(self.end("expression"));
        };
        match &next.token {
            Token::Int(value) => Ok(Expr::Int(*value)),
            Token::Ident(name) if self.eat(&Token::LParen) => {
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.expr()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma, "',' or ')'")?;
                    }
                }
                Ok(Expr::Call {
                    name: name.clone(),
                    args,
                    span: next.span.clone(),
                })
            }
            Token::Ident(name) => Ok(Expr::Name {
                name: name.clone(),
                span: next.span.clone(),
            }),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected(next, "expression")),
        }
    }

    fn unexpected(&self, token: &Spanned, expected: &'static str) -> CalcError {
        let (line, offset) = locate(self.source, token.span.start);
        CalcError::UnexpectedToken {
            found: format!("'{}'", &self.source[token.span.clone()]),
            expected,
            line,
            offset,
        }
    }

    fn end(&self, expected: &'static str) -> CalcError {
        let (line, offset) = locate(self.source, self.source.trim_end().len());
        CalcError::UnexpectedEnd {
            expected,
            line,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name(name: &str, start: usize) -> Expr {
        Expr::Name {
            name: name.to_string(),
            span: start..start + name.len(),
        }
    }

    #[test]
    fn test_parse_assignment_with_precedence() {
        let stmt = parse("a = b + 2 * 3").unwrap();
        assert_eq!(
            stmt,
            Stmt::Assign {
                name: "a".into(),
                value: Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(name("b", 4)),
                    rhs: Box::new(Expr::Binary {
                        op: BinaryOp::Mul,
                        lhs: Box::new(Expr::Int(2)),
                        rhs: Box::new(Expr::Int(3)),
                        span: 10..11,
                    }),
                    span: 6..7,
                },
            }
        );
    }

    #[test]
    fn test_parse_call_and_negation() {
        let stmt = parse("max(-1, (2))").unwrap();
        assert_eq!(
            stmt,
            Stmt::Expr(Expr::Call {
                name: "max".into(),
                args: vec![Expr::Neg(Box::new(Expr::Int(1))), Expr::Int(2)],
                span: 0..3,
            })
        );
    }

    #[test]
    fn test_trailing_garbage_is_syntax_error() {
        let err = parse("2a").unwrap_err();
        assert_eq!(
            err,
            CalcError::UnexpectedToken {
                found: "'a'".into(),
                expected: "end of statement",
                line: 1,
                offset: 1,
            }
        );
    }

    #[test]
    fn test_missing_operand_reports_end() {
        let err = parse("1 +\n").unwrap_err();
        assert!(matches!(
            err,
            CalcError::UnexpectedEnd {
                expected: "expression",
                line: 1,
                offset: 3,
            }
        ));
    }

    #[test]
    fn test_python_style_block_is_rejected() {
        assert!(parse("def a():\n  3").is_err());
    }
}
