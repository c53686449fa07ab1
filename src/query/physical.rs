//! Physical plans selected by the planner.

use std::fmt;

use crate::storage::{Lookup, Node, StoreHandle, Triple};

use super::analyze::{AnalyzedPattern, Slot, SlotId};

/// Executable plan bound to the store it was compiled against.
pub struct PhysicalPlan {
    /// Store every operator reads from or writes to.
    pub store: StoreHandle,
    /// Root operator.
    pub op: PhysicalOp,
}

impl fmt::Debug for PhysicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalPlan")
            .field("store", &self.store.name())
            .field("op", &self.op)
            .finish()
    }
}

/// Root operators.
#[derive(Clone, Debug)]
pub enum PhysicalOp {
    /// Adds ground triples.
    Insert {
        /// Triples to add.
        triples: Vec<Triple>,
    },
    /// Removes ground triples.
    Delete {
        /// Triples to remove.
        triples: Vec<Triple>,
    },
    /// Pattern query.
    Select(SelectPlan),
}

/// Join pipeline for a SELECT.
///
/// The first step is scanned by a producer task; every later step is an index
/// lookup substituted with the bindings accumulated so far.
#[derive(Clone, Debug)]
pub struct SelectPlan {
    /// Scan/join steps in execution order.
    pub steps: Vec<ScanStep>,
    /// Number of binding slots per row.
    pub slot_count: usize,
    /// Output column names, parallel to `projection`.
    pub columns: Vec<String>,
    /// Slots emitted per output row.
    pub projection: Vec<SlotId>,
    /// Remove duplicate output rows.
    pub distinct: bool,
    /// Row cap.
    pub limit: Option<usize>,
    /// Capacity of the producer/consumer buffer. Always positive.
    pub channel_capacity: usize,
}

/// One pattern in join order.
#[derive(Clone, Debug)]
pub struct ScanStep {
    /// Resolved pattern.
    pub pattern: AnalyzedPattern,
    /// Position of the pattern in the source statement.
    pub source_index: usize,
    /// Matching triples counted at plan time using constants only.
    pub estimate: usize,
}

impl ScanStep {
    /// Builds the store lookup for this step given the current bindings.
    pub fn lookup(&self, row: &[Option<Node>]) -> Lookup {
        let resolve = |slot: &Slot| match slot {
            Slot::Const(node) => Some(node.clone()),
            Slot::Var(SlotId(idx)) => row.get(*idx).cloned().flatten(),
        };
        let [s, p, o] = &self.pattern.terms;
        Lookup {
            subject: resolve(s),
            predicate: resolve(p),
            object: resolve(o),
        }
    }
}
