#![allow(missing_docs)]

use std::io;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use triq::batch::{
    Batch, BatchRunner, ChannelSize, ReportSink, RunSummary, StatementReport, StatementStatus,
};
use triq::query::ResultTable;
use triq::storage::{Lookup, MemoryStore, Node, StoreHandle};

#[derive(Default)]
struct Tables(Vec<Option<ResultTable>>);

impl ReportSink for Tables {
    fn begin(&mut self, _batch: &Batch) -> io::Result<()> {
        Ok(())
    }

    fn record(&mut self, report: &StatementReport) -> io::Result<()> {
        self.0.push(match &report.status {
            StatementStatus::Succeeded { table } => Some(table.clone()),
            _ => None,
        });
        Ok(())
    }

    fn finish(&mut self, _summary: &RunSummary) -> io::Result<()> {
        Ok(())
    }
}

async fn run(store: &StoreHandle, script: &str) -> Tables {
    let batch = Batch::parse("inline", script);
    let mut sink = Tables::default();
    BatchRunner::bql()
        .run(&batch, store, ChannelSize(0), &CancellationToken::new(), &mut sink)
        .await;
    sink
}

fn objects(table: &ResultTable) -> Vec<&str> {
    table.rows.iter().map(|row| row[0].as_str()).collect()
}

#[tokio::test]
async fn earlier_writes_are_visible_to_later_statements() {
    let store: StoreHandle = Arc::new(MemoryStore::new("shared"));
    let tables = run(
        &store,
        "SELECT ?o WHERE (a, b, ?o)\nINSERT (a, b, c)\nSELECT ?o WHERE (a, b, ?o)\n",
    )
    .await;

    let before = tables.0[0].as_ref().expect("first select succeeds");
    assert!(before.is_empty());
    let after = tables.0[2].as_ref().expect("second select succeeds");
    assert_eq!(objects(after), vec!["c"]);
}

#[tokio::test]
async fn the_caller_keeps_the_store_after_the_run() {
    let store: StoreHandle = Arc::new(MemoryStore::new("shared"));
    run(&store, "INSERT (a, b, c), (a, b, d)\nDELETE (a, b, c)\n").await;

    let remaining = store
        .scan(&Lookup::any())
        .expect("scan after run");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].object, Node::new("d"));

    let tables = run(&store, "SELECT * WHERE (a, b, ?o)\n").await;
    let table = tables.0[0].as_ref().expect("select succeeds");
    assert_eq!(table.columns, vec!["?o"]);
    assert_eq!(objects(table), vec!["d"]);
}

#[tokio::test]
async fn failed_writes_leave_the_store_untouched() {
    let store: StoreHandle = Arc::new(MemoryStore::new("shared"));
    run(&store, "INSERT (a, b, c), (?x, b, c)\nINSERT (a, b\n").await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn star_projection_names_anonymous_wildcards() {
    let store: StoreHandle = Arc::new(MemoryStore::new("shared"));
    let tables = run(&store, "INSERT (a, b, c)\nSELECT * WHERE (a, b, ?)\n").await;

    let table = tables.0[1].as_ref().expect("select succeeds");
    assert_eq!(table.columns, vec!["?_1"]);
    assert_eq!(objects(table), vec!["c"]);
    assert_eq!(table.column("?_1").map(|col| col.len()), Some(1));
}

#[tokio::test]
async fn underscore_variables_never_share_a_wildcard_column() {
    let store: StoreHandle = Arc::new(MemoryStore::new("shared"));
    let tables = run(
        &store,
        "INSERT (x, b, c)\nSELECT * WHERE (?_1, b, ?)\nSELECT * WHERE (?s, b, ?)\n",
    )
    .await;

    assert!(tables.0[1].is_none(), "reserved variable name must fail");
    let table = tables.0[2].as_ref().expect("select succeeds");
    assert_eq!(table.columns, vec!["?s", "?_1"]);
    assert_eq!(table.rows, vec![vec![Node::new("x"), Node::new("c")]]);
}
