//! Seams between the batch runner and a statement engine.
//!
//! The runner never looks inside intermediate forms. A compiler produces an
//! opaque [`Compiler::Output`], the planner turns it into an opaque
//! [`Planner::Plan`] against a store, and the executor turns that into a
//! [`ResultTable`]. Any engine that implements the three traits can be driven
//! by [`super::Pipeline`].

use std::error::Error as StdError;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::query::{
    self, analyze::AnalyzedStatement, physical::PhysicalPlan, CompileError, ExecuteError,
    PlanError, PlannerConfig, ResultTable,
};
use crate::storage::StoreHandle;

use super::script::ChannelSize;

/// Turns statement text into a validated intermediate form.
pub trait Compiler: Send + Sync {
    /// Compiled representation handed to the planner.
    type Output: Send;
    /// Compilation diagnostic.
    type Error: StdError + Send + Sync + 'static;

    /// Compiles one statement.
    fn compile(&self, text: &str) -> Result<Self::Output, Self::Error>;
}

/// Turns compiled statements into executable plans bound to a store.
pub trait Planner<Input>: Send + Sync {
    /// Plan handed to the executor.
    type Plan: Send;
    /// Planning diagnostic.
    type Error: StdError + Send + Sync + 'static;

    /// Plans `input` against `store`. The plan carries `channel` as its
    /// producer/consumer buffer capacity.
    fn plan(
        &self,
        input: Input,
        store: &StoreHandle,
        channel: ChannelSize,
    ) -> Result<Self::Plan, Self::Error>;
}

/// Runs plans, possibly mutating the store they are bound to.
#[async_trait]
pub trait Executor<Plan: Send + 'static>: Send + Sync {
    /// Execution diagnostic.
    type Error: StdError + Send + Sync + 'static;

    /// Runs `plan` until it finishes or `cancel` fires.
    async fn execute(
        &self,
        plan: Plan,
        cancel: &CancellationToken,
    ) -> Result<ResultTable, Self::Error>;
}

/// Compiler for the bundled triple pattern language.
#[derive(Clone, Copy, Debug, Default)]
pub struct BqlCompiler;

impl Compiler for BqlCompiler {
    type Output = AnalyzedStatement;
    type Error = CompileError;

    fn compile(&self, text: &str) -> Result<Self::Output, Self::Error> {
        query::compile(text)
    }
}

/// Planner for the bundled language. A fresh planner is built per statement
/// so each plan sees the store as it is after earlier statements.
#[derive(Clone, Copy, Debug, Default)]
pub struct BqlPlanner;

impl Planner<AnalyzedStatement> for BqlPlanner {
    type Plan = PhysicalPlan;
    type Error = PlanError;

    fn plan(
        &self,
        input: AnalyzedStatement,
        store: &StoreHandle,
        channel: ChannelSize,
    ) -> Result<Self::Plan, Self::Error> {
        let planner = query::Planner::new(
            Arc::clone(store),
            PlannerConfig {
                channel_capacity: channel.capacity(),
            },
        );
        Ok(planner.plan(input)?.plan)
    }
}

/// Executor for the bundled language.
#[derive(Clone, Copy, Debug, Default)]
pub struct BqlExecutor;

#[async_trait]
impl Executor<PhysicalPlan> for BqlExecutor {
    type Error = ExecuteError;

    async fn execute(
        &self,
        plan: PhysicalPlan,
        cancel: &CancellationToken,
    ) -> Result<ResultTable, Self::Error> {
        query::Executor::new().execute(plan, cancel).await
    }
}
