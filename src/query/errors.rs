#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use crate::types::TriqError;

/// Byte range within a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Lexer or parser failure with the offending location.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("syntax error at column {}: {message}", .span.start + 1)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Structured errors emitted by the statement validator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    /// INSERT/DELETE data must be fully ground.
    #[error("{statement} data must not contain variables (found {term})")]
    VariableInData {
        statement: &'static str,
        term: String,
    },
    /// Names starting with `_` are kept for anonymous wildcards.
    #[error("variable ?{var} uses the reserved '_' prefix")]
    ReservedVariable { var: String },
    /// Projected variable does not occur in any pattern.
    #[error("projected variable ?{var} is not bound by any pattern")]
    UnboundVariable { var: String },
    /// The same variable was projected twice.
    #[error("variable ?{var} projected more than once")]
    DuplicateProjection { var: String },
    /// `SELECT *` over patterns without any variables.
    #[error("SELECT * requires at least one variable in the WHERE clause")]
    EmptyProjection,
    /// Pattern budget exceeded.
    #[error("query exceeds {max} patterns (got {count})")]
    TooManyPatterns { count: usize, max: usize },
    /// Triple budget exceeded for a single write.
    #[error("statement exceeds {max} triples (got {count})")]
    TooManyTriples { count: usize, max: usize },
}

impl AnalyzerError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            AnalyzerError::VariableInData { .. } => "VariableInData",
            AnalyzerError::ReservedVariable { .. } => "ReservedVariable",
            AnalyzerError::UnboundVariable { .. } => "UnboundVariable",
            AnalyzerError::DuplicateProjection { .. } => "DuplicateProjection",
            AnalyzerError::EmptyProjection => "EmptyProjection",
            AnalyzerError::TooManyPatterns { .. } => "TooManyPatterns",
            AnalyzerError::TooManyTriples { .. } => "TooManyTriples",
        }
    }
}

/// Convenience wrapper that formats analyzer errors with their codes.
pub struct AnalyzerErrorWithCode<'a>(pub &'a AnalyzerError);

impl fmt::Display for AnalyzerErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}

/// Failure to turn statement text into a validated statement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("{}", AnalyzerErrorWithCode(.0))]
    Analyze(#[from] AnalyzerError),
}

/// Failure to build a plan for a statement against a store.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Writes are not possible on this store.
    #[error("store '{store}' is read-only; cannot plan {statement}")]
    ReadOnlyStore {
        store: String,
        statement: &'static str,
    },
    /// Patterns split into groups that share no variables.
    #[error("patterns form {groups} disconnected groups; cartesian products are not planned")]
    CartesianProduct { groups: usize },
    /// The requested buffer is larger than a bounded channel can hold.
    #[error("channel capacity {requested} exceeds the supported maximum of {max}")]
    ChannelCapacity { requested: usize, max: usize },
    /// Store failed while estimating cardinalities.
    #[error("store error while planning: {0}")]
    Store(#[from] TriqError),
}

/// Failure while running a plan.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The run's cancellation token fired.
    #[error("execution cancelled")]
    Cancelled,
    /// Store rejected a read or write.
    #[error(transparent)]
    Store(#[from] TriqError),
    /// The scan producer task did not finish cleanly.
    #[error("scan producer failed: {0}")]
    Producer(String),
    /// A projected column had no binding.
    #[error("internal error: {0}")]
    Internal(&'static str),
}
