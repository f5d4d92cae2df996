//! The calculator as an [`ExecutionBackend`].

use crate::lexer::locate;
use crate::parser::{BinaryOp, Expr, Stmt, parse};
use crate::scope::Scope;
use notebook_core::{
    CompiledStatement, ExecutionBackend, ExecutionContext, ExecutionError, ResultValue, RichResult,
    SyntaxError,
};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Payload of the rich result produced by `show(expr)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shown {
    /// The value that was shown.
    pub value: i64,
}

/// A compiled statement: the parsed tree and the source it came from.
#[derive(Debug)]
struct Program {
    stmt: Stmt,
    source: String,
}

/// Integer calculator backend.
///
/// Statements either bind a name (`a = 1`, no result) or evaluate an expression whose value
/// becomes the statement's single text result. `show(expr)` yields a rich result instead.
/// Builtins: `abs(x)`, `min(x, ...)`, `max(x, ...)`.
#[derive(Debug, Default)]
pub struct CalcBackend {
    compiled: usize,
    executed: usize,
}

impl CalcBackend {
    /// Create a backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements compiled so far.
    pub fn compiled(&self) -> usize {
        self.compiled
    }

    /// Statements executed so far.
    pub fn executed(&self) -> usize {
        self.executed
    }
}

impl ExecutionBackend for CalcBackend {
    fn compile(&mut self, source: &str) -> Result<CompiledStatement, SyntaxError> {
        self.compiled += 1;
        let stmt = parse(source)?;
        tracing::trace!(?stmt, "compiled statement");
        Ok(CompiledStatement::new(Program {
            stmt,
            source: source.to_string(),
        }))
    }

    fn execute(
        &mut self,
        statement: &CompiledStatement,
        parent: Option<&ExecutionContext>,
    ) -> Result<ExecutionContext, ExecutionError> {
        self.executed += 1;
        let program = statement.downcast_ref::<Program>().ok_or_else(|| {
            ExecutionError::new("statement was not compiled by this backend", None)
        })?;
        let scope = parent
            .and_then(|context| context.scope::<Rc<Scope>>())
            .cloned()
            .unwrap_or_else(Scope::root);

        let eval = Evaluator {
            scope: &scope,
            source: &program.source,
        };
        let mut bindings = FxHashMap::default();
        let mut results = Vec::new();
        match &program.stmt {
            Stmt::Assign { name, value } => {
                bindings.insert(name.clone(), eval.expr(value)?);
            }
            Stmt::Expr(Expr::Call { name, args, .. }) if name == "show" && args.len() == 1 => {
                let value = eval.expr(&args[0])?;
                results.push(ResultValue::Rich(RichResult::new(
                    format!("show({value})"),
                    Shown { value },
                )));
            }
            Stmt::Expr(expr) => {
                results.push(ResultValue::Text(eval.expr(expr)?.to_string()));
            }
        }

        Ok(ExecutionContext::new(
            Scope::layer(Some(scope), bindings),
            results,
        ))
    }
}

struct Evaluator<'a> {
    scope: &'a Scope,
    source: &'a str,
}

impl Evaluator<'_> {
    fn expr(&self, expr: &Expr) -> Result<i64, ExecutionError> {
        match expr {
            Expr::Int(value) => Ok(*value),
            Expr::Name { name, span } => self.scope.get(name).ok_or_else(|| {
                self.error(format!("NameError: name '{name}' is not defined"), span.start)
            }),
            Expr::Neg(inner) => self
                .expr(inner)?
                .checked_neg()
                .ok_or_else(|| ExecutionError::new("OverflowError: integer overflow", None)),
            Expr::Binary { op, lhs, rhs, span } => {
                let (lhs, rhs) = (self.expr(lhs)?, self.expr(rhs)?);
                let value = match op {
                    BinaryOp::Add => lhs.checked_add(rhs),
                    BinaryOp::Sub => lhs.checked_sub(rhs),
                    BinaryOp::Mul => lhs.checked_mul(rhs),
                    BinaryOp::Div | BinaryOp::Rem if rhs == 0 => {
                        return Err(self.error("ZeroDivisionError: division by zero", span.start));
                    }
                    BinaryOp::Div => lhs.checked_div(rhs),
                    BinaryOp::Rem => lhs.checked_rem(rhs),
                };
                value.ok_or_else(|| self.error("OverflowError: integer overflow", span.start))
            }
            Expr::Call { name, args, span } => {
                let values = args
                    .iter()
                    .map(|arg| self.expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                match (name.as_str(), values.as_slice()) {
                    ("abs", [value]) => value
                        .checked_abs()
                        .ok_or_else(|| self.error("OverflowError: integer overflow", span.start)),
                    ("min", [_, ..]) => Ok(values.iter().copied().min().unwrap_or_default()),
                    ("max", [_, ..]) => Ok(values.iter().copied().max().unwrap_or_default()),
                    ("show", _) => Err(self.error(
                        "TypeError: show() takes one argument and must be the whole statement",
                        span.start,
                    )),
                    ("abs" | "min" | "max", _) => Err(self.error(
                        format!("TypeError: wrong number of arguments to {name}()"),
                        span.start,
                    )),
                    _ => Err(self.error(
                        format!("NameError: name '{name}' is not defined"),
                        span.start,
                    )),
                }
            }
        }
    }

    fn error(&self, message: impl Into<String>, byte: usize) -> ExecutionError {
        let (line, _) = locate(self.source, byte);
        ExecutionError::new(message, Some(line))
    }
}
