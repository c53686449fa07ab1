//! Sequential batch driver.

use std::io;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::StoreHandle;

use super::adapters::{BqlCompiler, BqlExecutor, BqlPlanner, Compiler, Executor, Planner};
use super::outcome::{RunSummary, StatementReport, StatementStatus};
use super::pipeline::Pipeline;
use super::report::ReportSink;
use super::script::{Batch, ChannelSize};

/// Drives one [`Pipeline`] per statement, strictly in order.
#[derive(Clone, Debug, Default)]
pub struct BatchRunner<C, P, E> {
    pipeline: Pipeline<C, P, E>,
}

impl BatchRunner<BqlCompiler, BqlPlanner, BqlExecutor> {
    /// Runner over the bundled triple pattern language.
    pub fn bql() -> Self {
        Self::new(Pipeline::bql())
    }
}

impl<C, P, E> BatchRunner<C, P, E>
where
    C: Compiler,
    P: Planner<C::Output>,
    P::Plan: 'static,
    E: Executor<P::Plan>,
{
    /// Wraps `pipeline`.
    pub fn new(pipeline: Pipeline<C, P, E>) -> Self {
        Self { pipeline }
    }

    /// Runs every statement of `batch` against `store`.
    ///
    /// Statement failures are reported to `sink` and never stop the loop.
    /// Once `cancel` fires, statements not yet started are reported as
    /// [`StatementStatus::NotAttempted`].
    pub async fn run(
        &self,
        batch: &Batch,
        store: &StoreHandle,
        channel: ChannelSize,
        cancel: &CancellationToken,
        sink: &mut dyn ReportSink,
    ) -> RunSummary {
        let started = Instant::now();
        let total = batch.len();
        let mut summary = RunSummary {
            source: batch.source().to_string(),
            total,
            succeeded: 0,
            failed: 0,
            not_attempted: 0,
            cancelled: false,
            elapsed: Default::default(),
        };
        info!(
            source = batch.source(),
            statements = total,
            store = store.name(),
            channel = channel.capacity(),
            "batch.run.start"
        );
        sink_result("begin", sink.begin(batch));

        for statement in batch {
            let status = if summary.cancelled || cancel.is_cancelled() {
                if !summary.cancelled {
                    info!(position = statement.position, "batch.run.cancelled");
                    summary.cancelled = true;
                }
                summary.not_attempted += 1;
                StatementStatus::NotAttempted
            } else {
                debug!(
                    position = statement.position,
                    line = statement.line,
                    "batch.statement.start"
                );
                sink_result("started", sink.started(statement));
                let outcome = self.pipeline.run(statement, store, channel, cancel).await;
                if outcome.is_success() {
                    summary.succeeded += 1;
                } else {
                    summary.failed += 1;
                }
                StatementStatus::from(outcome)
            };
            let report = StatementReport {
                position: statement.position,
                total,
                text: statement.text.clone(),
                status,
            };
            sink_result("record", sink.record(&report));
        }

        summary.elapsed = started.elapsed();
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            not_attempted = summary.not_attempted,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "batch.run.finish"
        );
        sink_result("finish", sink.finish(&summary));
        summary
    }
}

fn sink_result(phase: &'static str, result: io::Result<()>) {
    if let Err(err) = result {
        warn!(phase, error = %err, "batch.report.write_failed");
    }
}
