use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::query::ResultTable;

/// Pipeline stage a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Parsing or validation.
    Compile,
    /// Planning against the store.
    Plan,
    /// Running the plan.
    Execute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Compile => "compile",
            Stage::Plan => "plan",
            Stage::Execute => "execute",
        })
    }
}

/// Why a statement failed, tagged with the stage that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatementFailure {
    /// Originating stage.
    pub stage: Stage,
    /// Adapter diagnostic.
    pub message: String,
}

impl StatementFailure {
    /// Creates a failure for `stage`.
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for StatementFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

/// Result of running one statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// All three stages succeeded.
    Succeeded(ResultTable),
    /// One stage failed; later stages did not run.
    Failed(StatementFailure),
}

impl ExecutionOutcome {
    /// Shorthand for a failed outcome.
    pub fn failed(stage: Stage, message: impl Into<String>) -> Self {
        ExecutionOutcome::Failed(StatementFailure::new(stage, message))
    }

    /// Whether the statement succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded(_))
    }

    /// Result table, when successful.
    pub fn table(&self) -> Option<&ResultTable> {
        match self {
            ExecutionOutcome::Succeeded(table) => Some(table),
            ExecutionOutcome::Failed(_) => None,
        }
    }

    /// Failure details, when failed.
    pub fn failure(&self) -> Option<&StatementFailure> {
        match self {
            ExecutionOutcome::Succeeded(_) => None,
            ExecutionOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// What the sink is told about one statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatementStatus {
    /// Statement ran and produced a table.
    Succeeded {
        /// The result.
        table: ResultTable,
    },
    /// Statement ran and failed.
    Failed {
        /// Stage-tagged reason.
        failure: StatementFailure,
    },
    /// Statement was skipped because the run was cancelled first.
    NotAttempted,
}

impl From<ExecutionOutcome> for StatementStatus {
    fn from(outcome: ExecutionOutcome) -> Self {
        match outcome {
            ExecutionOutcome::Succeeded(table) => StatementStatus::Succeeded { table },
            ExecutionOutcome::Failed(failure) => StatementStatus::Failed { failure },
        }
    }
}

/// Per-statement record handed to a [`super::ReportSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatementReport {
    /// 1-based ordinal.
    pub position: usize,
    /// Number of statements in the batch.
    pub total: usize,
    /// Statement text as read.
    pub text: String,
    /// Outcome, flattened into the record when serialized.
    #[serde(flatten)]
    pub status: StatementStatus,
}

/// Overall run status. Statement failures never turn a run into a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The runner went through the whole batch (possibly skipping statements
    /// after cancellation).
    Completed,
}

/// Totals for a finished run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Batch source identity.
    pub source: String,
    /// Statements in the batch.
    pub total: usize,
    /// Statements that succeeded.
    pub succeeded: usize,
    /// Statements that failed at any stage.
    pub failed: usize,
    /// Statements skipped because of cancellation.
    pub not_attempted: usize,
    /// Whether cancellation stopped the loop early.
    pub cancelled: bool,
    /// Wall time of the run.
    #[serde(serialize_with = "serialize_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Always [`RunStatus::Completed`].
    pub fn status(&self) -> RunStatus {
        RunStatus::Completed
    }
}

fn serialize_millis<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(value.as_secs_f64() * 1_000.0)
}
