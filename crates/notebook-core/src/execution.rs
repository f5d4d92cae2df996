//! Execution backend contract and the execution driver.
//!
//! The engine never interprets code. A backend turns statement source into an opaque
//! [`CompiledStatement`] and executes it on top of the [`ExecutionContext`] left by the previous
//! statement. Backends are injected per call rather than looked up, so there is no global module
//! registry: all per-document state lives in the contexts.

use crate::chunk::{ChunkId, ChunkKind};
use crate::error::{ExecutionError, NotebookError, SyntaxError};
use crate::notebook::Notebook;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Opaque handle to a compiled statement.
#[derive(Clone)]
pub struct CompiledStatement(Rc<dyn Any>);

impl CompiledStatement {
    /// Wrap a backend-specific compiled unit.
    pub fn new<T: Any>(value: T) -> Self {
        Self(Rc::new(value))
    }

    /// Borrow the backend-specific compiled unit.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for CompiledStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompiledStatement(..)")
    }
}

/// An opaque, non-text result object (plots, widgets, ...).
#[derive(Clone)]
pub struct RichResult {
    label: String,
    payload: Rc<dyn Any>,
}

impl RichResult {
    /// Create a rich result with a short label used for logging and plain-text views.
    pub fn new<T: Any>(label: impl Into<String>, payload: T) -> Self {
        Self {
            label: label.into(),
            payload: Rc::new(payload),
        }
    }

    /// Short description.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Borrow the payload.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }
}

impl fmt::Debug for RichResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RichResult")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// One item of a statement's output.
#[derive(Debug, Clone)]
pub enum ResultValue {
    /// Plain text, rendered verbatim (may span several lines).
    Text(String),
    /// A rich object, rendered as a single placeholder line.
    Rich(RichResult),
}

impl ResultValue {
    /// Text of a [`ResultValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Rich(_) => None,
        }
    }
}

impl From<String> for ResultValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ResultValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// The state a statement leaves behind after executing, handed to the next statement.
#[derive(Clone)]
pub struct ExecutionContext {
    scope: Rc<dyn Any>,
    results: Vec<ResultValue>,
}

impl ExecutionContext {
    /// Create a context from a backend-specific scope and the results it produced.
    pub fn new<S: Any>(scope: S, results: Vec<ResultValue>) -> Self {
        Self {
            scope: Rc::new(scope),
            results,
        }
    }

    /// Borrow the backend-specific scope.
    pub fn scope<S: Any>(&self) -> Option<&S> {
        self.scope.downcast_ref()
    }

    /// Results produced by the execution.
    pub fn results(&self) -> &[ResultValue] {
        &self.results
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

/// Contract of a statement compiler/executor.
pub trait ExecutionBackend {
    /// Compile one statement's source.
    fn compile(&mut self, source: &str) -> Result<CompiledStatement, SyntaxError>;

    /// Execute a compiled statement on top of the preceding statement's context
    /// (`None` for the first statement of the notebook).
    fn execute(
        &mut self,
        statement: &CompiledStatement,
        parent: Option<&ExecutionContext>,
    ) -> Result<ExecutionContext, ExecutionError>;
}

impl<B: ExecutionBackend + ?Sized> ExecutionBackend for &mut B {
    fn compile(&mut self, source: &str) -> Result<CompiledStatement, SyntaxError> {
        (**self).compile(source)
    }

    fn execute(
        &mut self,
        statement: &CompiledStatement,
        parent: Option<&ExecutionContext>,
    ) -> Result<ExecutionContext, ExecutionError> {
        (**self).execute(statement, parent)
    }
}

/// Outcome of one [`Notebook::calculate`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculateReport {
    /// Statements compiled in this pass.
    pub compiled: usize,
    /// Statements executed in this pass.
    pub executed: usize,
    /// The first statement holding an error after this pass.
    pub first_error: Option<ChunkId>,
}

impl Notebook {
    /// Compile and execute every statement that needs it, top to bottom.
    ///
    /// Each statement runs on the context left by the statement above it. The first error stops
    /// execution for the rest of the pass; compilation of later statements still proceeds.
    pub fn calculate<B: ExecutionBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<CalculateReport, NotebookError> {
        let report = self.calculate_pass(backend)?;
        self.finish_operation()?;
        Ok(report)
    }

    fn calculate_pass<B: ExecutionBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<CalculateReport, NotebookError> {
        let statements: Vec<ChunkId> = self
            .model
            .iter()
            .filter(|chunk| matches!(chunk.kind, ChunkKind::Statement(_)))
            .map(|chunk| chunk.id)
            .collect();
        tracing::debug!(statements = statements.len(), "calculate pass");

        let mut report = CalculateReport::default();
        let mut parent: Option<ExecutionContext> = None;
        let mut have_error = false;

        for id in statements {
            let (needs_compile, needs_execute) = {
                let statement = self.statement(id)?;
                (statement.needs_compile(), statement.needs_execute())
            };

            if (needs_compile || (needs_execute && !have_error))
                && let Some(old_result) = self.find_result(id)
            {
                self.delete_chunk(old_result)?;
            }

            let mut changed = false;
            if needs_compile {
                changed = true;
                report.compiled += 1;
                let statement = self.statement_mut(id)?;
                statement.compile(backend);
                if statement.error().is_some() {
                    self.insert_result(id)?;
                }
            }

            if self.statement(id)?.needs_execute() && !have_error {
                changed = true;
                report.executed += 1;
                let statement = self.statement_mut(id)?;
                statement.execute(backend, parent.as_ref())?;
                if statement.has_output() {
                    self.insert_result(id)?;
                }
            }

            let statement = self.statement(id)?;
            if statement.error().is_some() {
                if !have_error {
                    report.first_error = Some(id);
                }
                have_error = true;
                parent = None;
            } else {
                parent = statement.context().cloned();
            }

            if changed {
                self.notify_chunk(id);
            }
        }

        Ok(report)
    }
}
