#![allow(missing_docs)]

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use triq::batch::adapters::{Compiler, Executor, Planner};
use triq::batch::{
    Batch, BatchRunner, ChannelSize, Pipeline, PlainReport, ReportSink, RunStatus, RunSummary,
    Stage, StatementReport, StatementStatus,
};
use triq::query::ResultTable;
use triq::storage::{MemoryStore, Node, StoreHandle};

#[derive(Default)]
struct Collect(Vec<StatementReport>);

impl ReportSink for Collect {
    fn begin(&mut self, _batch: &Batch) -> io::Result<()> {
        Ok(())
    }

    fn record(&mut self, report: &StatementReport) -> io::Result<()> {
        self.0.push(report.clone());
        Ok(())
    }

    fn finish(&mut self, _summary: &RunSummary) -> io::Result<()> {
        Ok(())
    }
}

fn store() -> StoreHandle {
    Arc::new(MemoryStore::new("integration"))
}

fn stage(report: &StatementReport) -> Option<Stage> {
    match &report.status {
        StatementStatus::Failed { failure } => Some(failure.stage),
        _ => None,
    }
}

#[tokio::test]
async fn comment_and_blank_lines_never_produce_outcomes() {
    let batch = Batch::parse("inline", "# comment\n\nBADSTATEMENT\nSELECT x WHERE (x)\n");
    let mut sink = Collect::default();
    let summary = BatchRunner::bql()
        .run(&batch, &store(), ChannelSize(0), &CancellationToken::new(), &mut sink)
        .await;

    assert_eq!(sink.0.len(), 2);
    assert_eq!(sink.0[0].text, "BADSTATEMENT");
    assert_eq!(stage(&sink.0[0]), Some(Stage::Compile));
    assert_eq!(sink.0[1].text, "SELECT x WHERE (x)");
    assert_eq!(stage(&sink.0[1]), Some(Stage::Compile));
    assert_eq!(summary.status(), RunStatus::Completed);
    assert_eq!(summary.failed, 2);
}

#[tokio::test]
async fn every_stage_failure_is_isolated() {
    let store = Arc::new(MemoryStore::new("ro").into_read_only()) as StoreHandle;
    let batch = Batch::parse(
        "inline",
        "INSERT (a, b, c)\nSELECT ?s WHERE (?s, ?p, ?o)\nNOT A STATEMENT\nSELECT ?s WHERE (?s, p, o)\n",
    );
    let mut sink = Collect::default();
    let summary = BatchRunner::bql()
        .run(&batch, &store, ChannelSize(4), &CancellationToken::new(), &mut sink)
        .await;

    let stages: Vec<Option<Stage>> = sink.0.iter().map(stage).collect();
    assert_eq!(
        stages,
        vec![Some(Stage::Plan), None, Some(Stage::Compile), None]
    );
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 2);
}

#[tokio::test]
async fn channel_size_zero_matches_an_explicit_default() {
    let script = "INSERT (a, p, b), (b, p, c), (c, p, d)\nSELECT ?x, ?z WHERE (?x, p, ?y), (?y, p, ?z)\n";
    let mut outputs = Vec::new();
    for channel in [ChannelSize(0), ChannelSize(ChannelSize::DEFAULT_CAPACITY), ChannelSize(1)] {
        let batch = Batch::parse("inline", script);
        let mut plain = PlainReport::new(Vec::new());
        BatchRunner::bql()
            .run(&batch, &store(), channel, &CancellationToken::new(), &mut plain)
            .await;
        outputs.push(String::from_utf8(plain.into_inner()).expect("utf8"));
    }
    assert!(outputs[0].contains("| a  | c  |"), "{}", outputs[0]);
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0], outputs[2]);
}

#[tokio::test]
async fn oversized_channel_is_a_plan_failure_not_a_panic() {
    let batch = Batch::parse("inline", "INSERT (a, b, c)\nSELECT ?o WHERE (a, b, ?o)\n");
    let mut sink = Collect::default();
    let summary = BatchRunner::bql()
        .run(
            &batch,
            &store(),
            ChannelSize(ChannelSize::MAX_CAPACITY + 1),
            &CancellationToken::new(),
            &mut sink,
        )
        .await;

    assert_eq!(stage(&sink.0[0]), None);
    let StatementStatus::Failed { failure } = &sink.0[1].status else {
        panic!("select should fail: {:?}", sink.0[1]);
    };
    assert_eq!(failure.stage, Stage::Plan);
    assert!(failure.message.contains("exceeds the supported maximum"), "{}", failure.message);
    assert_eq!(summary.succeeded, 1);
}

#[derive(Debug, Error)]
#[error("{0}")]
struct FakeError(&'static str);

struct Verbatim;

impl Compiler for Verbatim {
    type Output = String;
    type Error = FakeError;

    fn compile(&self, text: &str) -> Result<String, FakeError> {
        Ok(text.to_string())
    }
}

impl Planner<String> for Verbatim {
    type Plan = String;
    type Error = FakeError;

    fn plan(
        &self,
        input: String,
        _store: &StoreHandle,
        _channel: ChannelSize,
    ) -> Result<String, FakeError> {
        Ok(input)
    }
}

/// Cancels the run when it sees `STOP`, otherwise echoes the statement.
struct Stopper {
    cancel: CancellationToken,
}

#[async_trait]
impl Executor<String> for Stopper {
    type Error = FakeError;

    async fn execute(
        &self,
        plan: String,
        _cancel: &CancellationToken,
    ) -> Result<ResultTable, FakeError> {
        if plan == "STOP" {
            self.cancel.cancel();
            return Err(FakeError("stopped"));
        }
        let mut table = ResultTable::new(vec!["text".into()]);
        table.rows.push(vec![Node::new(plan)]);
        Ok(table)
    }
}

#[tokio::test]
async fn cancellation_between_statements_skips_the_rest() {
    let cancel = CancellationToken::new();
    let runner = BatchRunner::new(Pipeline::new(
        Verbatim,
        Verbatim,
        Stopper {
            cancel: cancel.clone(),
        },
    ));
    let batch = Batch::parse("inline", "one\ntwo\nSTOP\nfour\nfive\n");
    let mut sink = Collect::default();
    let summary = runner
        .run(&batch, &store(), ChannelSize(0), &cancel, &mut sink)
        .await;

    assert_eq!(sink.0.len(), 5);
    assert!(matches!(sink.0[0].status, StatementStatus::Succeeded { .. }));
    assert!(matches!(sink.0[1].status, StatementStatus::Succeeded { .. }));
    assert_eq!(stage(&sink.0[2]), Some(Stage::Execute));
    assert_eq!(sink.0[3].status, StatementStatus::NotAttempted);
    assert_eq!(sink.0[4].status, StatementStatus::NotAttempted);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.not_attempted, 2);
    assert!(summary.cancelled);
    assert_eq!(summary.status(), RunStatus::Completed);
}
