//! Compile, plan and execute one statement.

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::storage::StoreHandle;

use super::adapters::{BqlCompiler, BqlExecutor, BqlPlanner, Compiler, Executor, Planner};
use super::outcome::{ExecutionOutcome, Stage, StatementFailure};
use super::script::{ChannelSize, ScriptStatement};

/// Three adapters wired in stage order.
///
/// A failure at any stage stops that statement only. Adapter panics are
/// caught and reported as failures of the stage that panicked.
#[derive(Clone, Debug, Default)]
pub struct Pipeline<C, P, E> {
    compiler: C,
    planner: P,
    executor: E,
}

impl Pipeline<BqlCompiler, BqlPlanner, BqlExecutor> {
    /// Pipeline over the bundled triple pattern language.
    pub fn bql() -> Self {
        Self::new(BqlCompiler, BqlPlanner, BqlExecutor)
    }
}

impl<C, P, E> Pipeline<C, P, E>
where
    C: Compiler,
    P: Planner<C::Output>,
    P::Plan: 'static,
    E: Executor<P::Plan>,
{
    /// Wires the given adapters.
    pub fn new(compiler: C, planner: P, executor: E) -> Self {
        Self {
            compiler,
            planner,
            executor,
        }
    }

    /// Runs one statement against `store`.
    ///
    /// Never fails as a whole: every error becomes an
    /// [`ExecutionOutcome::Failed`] tagged with its stage.
    pub async fn run(
        &self,
        statement: &ScriptStatement,
        store: &StoreHandle,
        channel: ChannelSize,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        let position = statement.position;

        let compiled = match guarded(Stage::Compile, || self.compiler.compile(&statement.text)) {
            Ok(compiled) => compiled,
            Err(failure) => return reject(position, failure),
        };
        trace!(position, "batch.pipeline.compiled");

        let plan = match guarded(Stage::Plan, || {
            self.planner.plan(compiled, store, channel)
        }) {
            Ok(plan) => plan,
            Err(failure) => return reject(position, failure),
        };
        trace!(position, channel = channel.capacity(), "batch.pipeline.planned");

        let execution = AssertUnwindSafe(self.executor.execute(plan, cancel)).catch_unwind();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return reject(position, StatementFailure::new(Stage::Execute, "statement cancelled"));
            }
            result = execution => result,
        };
        match result {
            Ok(Ok(table)) => {
                debug!(position, rows = table.num_rows(), "batch.pipeline.succeeded");
                ExecutionOutcome::Succeeded(table)
            }
            Ok(Err(err)) => reject(position, StatementFailure::new(Stage::Execute, err.to_string())),
            Err(payload) => reject(position, panicked(Stage::Execute, payload)),
        }
    }
}

fn guarded<T, Er: Display>(
    stage: Stage,
    f: impl FnOnce() -> Result<T, Er>,
) -> Result<T, StatementFailure> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(StatementFailure::new(stage, err.to_string())),
        Err(payload) => Err(panicked(stage, payload)),
    }
}

fn panicked(stage: Stage, payload: Box<dyn Any + Send>) -> StatementFailure {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    StatementFailure::new(stage, format!("adapter panicked: {detail}"))
}

fn reject(position: usize, failure: StatementFailure) -> ExecutionOutcome {
    debug!(
        position,
        stage = %failure.stage,
        reason = %failure.message,
        "batch.pipeline.failed"
    );
    ExecutionOutcome::Failed(failure)
}
