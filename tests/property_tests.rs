#![allow(missing_docs)]

use std::io;
use std::sync::Arc;

use proptest::prelude::*;
use tokio_util::sync::CancellationToken;
use triq::batch::{
    Batch, BatchRunner, ChannelSize, ReportSink, RunSummary, StatementReport, StatementStatus,
};
use triq::storage::{MemoryStore, StoreHandle};

#[derive(Debug, Clone)]
enum Line {
    Comment(String),
    Blank,
    Insert(u8, u8),
    Select(u8),
    Garbage(String),
}

impl Line {
    fn render(&self) -> String {
        match self {
            Line::Comment(text) => format!("# {text}"),
            Line::Blank => "   ".to_string(),
            Line::Insert(s, o) => format!("INSERT (n{s}, p, n{o})"),
            Line::Select(s) => format!("SELECT ?o WHERE (n{s}, p, ?o)"),
            Line::Garbage(text) => format!("FROB {text}"),
        }
    }

    fn is_statement(&self) -> bool {
        !matches!(self, Line::Comment(_) | Line::Blank)
    }
}

fn arb_line() -> impl Strategy<Value = Line> {
    prop_oneof![
        "[a-z ]{0,12}".prop_map(Line::Comment),
        Just(Line::Blank),
        (0u8..6, 0u8..6).prop_map(|(s, o)| Line::Insert(s, o)),
        (0u8..6).prop_map(Line::Select),
        "[a-z]{1,8}".prop_map(Line::Garbage),
    ]
}

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

fn run_script(script: &str, channel: usize) -> (Vec<StatementReport>, RunSummary) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    runtime.block_on(async {
        let store: StoreHandle = Arc::new(MemoryStore::new("prop"));
        let batch = Batch::parse("prop", script);
        let mut sink = Collect::default();
        let summary = BatchRunner::bql()
            .run(
                &batch,
                &store,
                ChannelSize(channel),
                &CancellationToken::new(),
                &mut sink,
            )
            .await;
        (sink.0, summary)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn one_outcome_per_statement_in_order(
        lines in prop::collection::vec(arb_line(), 0..24),
        channel in 0usize..4,
    ) {
        let script = lines.iter().map(Line::render).collect::<Vec<_>>().join("\n");
        let expected: Vec<&Line> = lines.iter().filter(|line| line.is_statement()).collect();
        let (reports, summary) = run_script(&script, channel);

        prop_assert_eq!(reports.len(), expected.len());
        prop_assert_eq!(summary.total, expected.len());
        prop_assert_eq!(summary.succeeded + summary.failed, expected.len());
        prop_assert_eq!(summary.not_attempted, 0);

        for (idx, (report, line)) in reports.iter().zip(&expected).enumerate() {
            prop_assert_eq!(report.position, idx + 1);
            prop_assert_eq!(&report.text, &line.render());
            let failed = matches!(report.status, StatementStatus::Failed { .. });
            prop_assert_eq!(failed, matches!(line, Line::Garbage(_)));
        }
    }
}
