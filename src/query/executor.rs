//! Plan execution.
//!
//! SELECT plans run as two stages: a producer task scans the first join step
//! and feeds a bounded channel; the consumer extends each triple through the
//! remaining steps. The channel capacity comes from the plan and also sizes
//! each store page the producer fetches, so a slow consumer stalls the scan
//! instead of buffering the whole result. Later join steps still scan
//! per binding row.

use rustc_hash::FxHashSet;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::storage::{Node, Store, StoreHandle, Triple};
use crate::types::TriqError;

use super::analyze::{Slot, SlotId};
use super::errors::ExecuteError;
use super::physical::{PhysicalOp, PhysicalPlan, ScanStep, SelectPlan};
use super::table::ResultTable;

type BindingRow = Vec<Option<Node>>;

/// Executes physical plans. Stateless; the store travels inside the plan.
#[derive(Clone, Copy, Debug, Default)]
pub struct Executor;

impl Executor {
    /// Creates an executor.
    pub fn new() -> Self {
        Self
    }

    /// Runs `plan` to completion or until `cancel` fires.
    pub async fn execute(
        &self,
        plan: PhysicalPlan,
        cancel: &CancellationToken,
    ) -> Result<ResultTable, ExecuteError> {
        if cancel.is_cancelled() {
            return Err(ExecuteError::Cancelled);
        }
        let PhysicalPlan { store, op } = plan;
        match op {
            PhysicalOp::Insert { triples } => {
                let added = store.insert(&triples)?;
                debug!(store = store.name(), added, "query.executor.insert");
                Ok(ResultTable::default())
            }
            PhysicalOp::Delete { triples } => {
                let removed = store.delete(&triples)?;
                debug!(store = store.name(), removed, "query.executor.delete");
                Ok(ResultTable::default())
            }
            PhysicalOp::Select(select) => run_select(store, select, cancel).await,
        }
    }
}

async fn run_select(
    store: StoreHandle,
    plan: SelectPlan,
    cancel: &CancellationToken,
) -> Result<ResultTable, ExecuteError> {
    let Some((first, rest)) = plan.steps.split_first() else {
        return Err(ExecuteError::Internal("select plan has no steps"));
    };

    let (tx, mut rx) = mpsc::channel::<Triple>(plan.channel_capacity);
    let producer_cancel = cancel.child_token();
    let producer = {
        let store = store.clone();
        let lookup = first.lookup(&vec![None; plan.slot_count]);
        let stop = producer_cancel.clone();
        let page_size = plan.channel_capacity;
        tokio::spawn(async move {
            let mut sent = 0usize;
            let mut cursor: Option<Triple> = None;
            'pages: loop {
                let page = store.scan_page(&lookup, cursor.as_ref(), page_size)?;
                let exhausted = page.len() < page_size;
                cursor = page.last().cloned();
                for triple in page {
                    tokio::select! {
                        biased;
                        _ = stop.cancelled() => break 'pages,
                        res = tx.send(triple) => {
                            if res.is_err() {
                                break 'pages;
                            }
                            sent += 1;
                        }
                    }
                }
                if exhausted {
                    break;
                }
            }
            trace!(sent, "query.select.producer_done");
            Ok::<usize, TriqError>(sent)
        })
    };

    let mut out = Collector::new(&plan);
    let consumed: Result<(), ExecuteError> = async {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ExecuteError::Cancelled),
                item = rx.recv() => item,
            };
            let Some(triple) = next else {
                return Ok(());
            };
            let mut row: BindingRow = vec![None; plan.slot_count];
            if !bind(&first.pattern.terms, &triple, &mut row) {
                continue;
            }
            if !extend(store.as_ref(), rest, row, &mut out, cancel)? {
                return Ok(());
            }
        }
    }
    .await;

    // Stop the scan before reporting, whatever the consumer outcome.
    producer_cancel.cancel();
    drop(rx);
    let produced = producer
        .await
        .map_err(|err| ExecuteError::Producer(err.to_string()))?;
    consumed?;
    produced?;

    debug!(rows = out.table.num_rows(), "query.executor.select");
    Ok(out.table)
}

/// Extends `row` through `steps`, pushing complete rows into `out`.
/// Returns `false` once the collector is full.
fn extend(
    store: &dyn Store,
    steps: &[ScanStep],
    row: BindingRow,
    out: &mut Collector,
    cancel: &CancellationToken,
) -> Result<bool, ExecuteError> {
    let Some((step, rest)) = steps.split_first() else {
        return out.push(&row);
    };
    if cancel.is_cancelled() {
        return Err(ExecuteError::Cancelled);
    }
    for triple in store.scan(&step.lookup(&row))? {
        let mut next = row.clone();
        if !bind(&step.pattern.terms, &triple, &mut next) {
            continue;
        }
        if !extend(store, rest, next, out, cancel)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Unifies a pattern with a triple. Repeated variables must agree.
fn bind(terms: &[Slot; 3], triple: &Triple, row: &mut BindingRow) -> bool {
    let values = [&triple.subject, &triple.predicate, &triple.object];
    for (slot, value) in terms.iter().zip(values) {
        match slot {
            Slot::Const(node) => {
                if node != value {
                    return false;
                }
            }
            Slot::Var(SlotId(idx)) => {
                if let Some(existing) = &row[*idx] {
                    if existing != value {
                        return false;
                    }
                } else {
                    row[*idx] = Some(value.clone());
                }
            }
        }
    }
    true
}

struct Collector {
    projection: Vec<SlotId>,
    distinct: Option<FxHashSet<Vec<Node>>>,
    limit: Option<usize>,
    table: ResultTable,
}

impl Collector {
    fn new(plan: &SelectPlan) -> Self {
        Self {
            projection: plan.projection.clone(),
            distinct: plan.distinct.then(FxHashSet::default),
            limit: plan.limit,
            table: ResultTable::new(plan.columns.clone()),
        }
    }

    fn is_full(&self) -> bool {
        self.limit
            .is_some_and(|limit| self.table.num_rows() >= limit)
    }

    fn push(&mut self, row: &BindingRow) -> Result<bool, ExecuteError> {
        if self.is_full() {
            return Ok(false);
        }
        let mut values = Vec::with_capacity(self.projection.len());
        for SlotId(idx) in &self.projection {
            let value = row
                .get(*idx)
                .cloned()
                .flatten()
                .ok_or(ExecuteError::Internal("projected slot left unbound"))?;
            values.push(value);
        }
        if let Some(seen) = self.distinct.as_mut() {
            if !seen.insert(values.clone()) {
                return Ok(true);
            }
        }
        self.table.rows.push(values);
        Ok(!self.is_full())
    }
}
