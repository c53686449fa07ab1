#![forbid(unsafe_code)]

//! Reference statement engine: parsing, validation, planning and execution
//! of the triple pattern language.
//!
//! The batch runner only sees this module through the adapters in
//! [`crate::batch::adapters`]; any other engine can be plugged in there.

/// Validation and variable resolution.
pub mod analyze;

/// Abstract syntax tree for statements.
pub mod ast;

/// Error types for every stage.
pub mod errors;

/// Plan execution over a store.
pub mod executor;

/// Statement tokenizer.
pub mod lexer;

/// Statement parser.
pub mod parser;

/// Join ordering and plan construction.
pub mod planner;

/// Executable plan representation.
pub mod physical;

/// Tabular results.
pub mod table;

pub use errors::{AnalyzerError, CompileError, ExecuteError, PlanError, SyntaxError};
pub use executor::Executor;
pub use planner::{PlanExplain, Planner, PlannerConfig, PlannerOutput, MAX_CHANNEL_CAPACITY};
pub use table::ResultTable;

/// Parses and validates one statement.
pub fn compile(text: &str) -> Result<analyze::AnalyzedStatement, CompileError> {
    let statement = parser::parse_statement(text)?;
    Ok(analyze::analyze(statement)?)
}
