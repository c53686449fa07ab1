//! Rule-based planner.

use std::fmt;
use std::hash::Hasher;

use tracing::debug;
use xxhash_rust::xxh64::Xxh64;

use crate::storage::{Lookup, StoreHandle};

use super::analyze::{AnalyzedPattern, AnalyzedSelect, AnalyzedStatement, Slot, SlotId};
use super::errors::PlanError;
use super::physical::{PhysicalOp, PhysicalPlan, ScanStep, SelectPlan};

/// Largest producer/consumer buffer the executor's channel supports.
pub const MAX_CHANNEL_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Planner inputs that influence plan shape.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Producer/consumer buffer capacity. Must already be resolved (non-zero).
    pub channel_capacity: usize,
}

/// Planner output containing the chosen physical plan and explain tree.
#[derive(Debug)]
pub struct PlannerOutput {
    /// The generated physical plan.
    pub plan: PhysicalPlan,
    /// Human-readable explain tree.
    pub explain: PlanExplain,
    /// Deterministic hash of the explain tree.
    pub plan_hash: u64,
}

/// Human-readable explain tree.
#[derive(Clone, Debug)]
pub struct PlanExplain {
    /// Root node of the explain tree.
    pub root: ExplainNode,
}

/// Explain node representing an operator with optional metadata.
#[derive(Clone, Debug)]
pub struct ExplainNode {
    /// Operator name.
    pub op: String,
    /// Additional properties describing the operator.
    pub props: Vec<(String, String)>,
    /// Input operators.
    pub inputs: Vec<ExplainNode>,
}

impl ExplainNode {
    fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            props: Vec::new(),
            inputs: Vec::new(),
        }
    }

    fn prop(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.props.push((key.into(), value.to_string()));
        self
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.op, indent = depth * 2)?;
        for (key, value) in &self.props {
            write!(f, " {key}={value}")?;
        }
        writeln!(f)?;
        for input in &self.inputs {
            input.write(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for PlanExplain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.write(f, 0)
    }
}

/// Compiles analyzed statements against one store.
pub struct Planner {
    store: StoreHandle,
    config: PlannerConfig,
}

impl Planner {
    /// Creates a planner for `store`.
    pub fn new(store: StoreHandle, config: PlannerConfig) -> Self {
        Self { store, config }
    }

    /// Converts an analyzed statement into a physical plan.
    pub fn plan(&self, statement: AnalyzedStatement) -> Result<PlannerOutput, PlanError> {
        let kind = statement.kind();
        if matches!(
            statement,
            AnalyzedStatement::Insert(_) | AnalyzedStatement::Delete(_)
        ) && self.store.is_read_only()
        {
            return Err(PlanError::ReadOnlyStore {
                store: self.store.name().to_string(),
                statement: kind,
            });
        }

        let op = match statement {
            AnalyzedStatement::Insert(triples) => PhysicalOp::Insert { triples },
            AnalyzedStatement::Delete(triples) => PhysicalOp::Delete { triples },
            AnalyzedStatement::Select(select) => PhysicalOp::Select(self.plan_select(select)?),
        };
        let explain = PlanExplain {
            root: build_explain_tree(&op, self.store.name()),
        };
        let plan_hash = compute_plan_hash(&explain);
        debug!(plan_hash, statement = kind, explain = %explain, "query.planner.plan");
        Ok(PlannerOutput {
            plan: PhysicalPlan {
                store: self.store.clone(),
                op,
            },
            explain,
            plan_hash,
        })
    }

    fn plan_select(&self, select: AnalyzedSelect) -> Result<SelectPlan, PlanError> {
        let channel_capacity = self.config.channel_capacity.max(1);
        if channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(PlanError::ChannelCapacity {
                requested: channel_capacity,
                max: MAX_CHANNEL_CAPACITY,
            });
        }
        let groups = connected_groups(&select.patterns, select.slots.len());
        if groups > 1 {
            return Err(PlanError::CartesianProduct { groups });
        }

        let mut pending = Vec::with_capacity(select.patterns.len());
        for (source_index, pattern) in select.patterns.into_iter().enumerate() {
            let estimate = self.store.count(&constant_lookup(&pattern))?;
            pending.push(ScanStep {
                pattern,
                source_index,
                estimate,
            });
        }

        let steps = order_steps(pending, select.slots.len());
        let columns = select
            .projection
            .iter()
            .map(|SlotId(idx)| select.slots[*idx].clone())
            .collect();
        Ok(SelectPlan {
            steps,
            slot_count: select.slots.len(),
            columns,
            projection: select.projection,
            distinct: select.distinct,
            limit: select.limit,
            channel_capacity,
        })
    }
}

fn constant_lookup(pattern: &AnalyzedPattern) -> Lookup {
    let constant = |slot: &Slot| match slot {
        Slot::Const(node) => Some(node.clone()),
        Slot::Var(_) => None,
    };
    let [s, p, o] = &pattern.terms;
    Lookup {
        subject: constant(s),
        predicate: constant(p),
        object: constant(o),
    }
}

/// Counts groups of variable-bearing patterns linked by shared slots.
/// Fully constant patterns act as existence guards and join any group.
fn connected_groups(patterns: &[AnalyzedPattern], slot_count: usize) -> usize {
    let mut parent: Vec<usize> = (0..slot_count).collect();
    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }
    for pattern in patterns {
        let vars: Vec<usize> = pattern.vars().map(|SlotId(idx)| idx).collect();
        for pair in vars.windows(2) {
            let (a, b) = (find(&mut parent, pair[0]), find(&mut parent, pair[1]));
            if a != b {
                parent[a] = b;
            }
        }
    }
    let mut roots: Vec<usize> = (0..slot_count).map(|idx| find(&mut parent, idx)).collect();
    roots.sort_unstable();
    roots.dedup();
    roots.len()
}

/// Greedy join ordering: cheapest scan first, then the pattern with the most
/// positions already bound, ties broken by estimate and source position.
fn order_steps(mut pending: Vec<ScanStep>, slot_count: usize) -> Vec<ScanStep> {
    let mut bound = vec![false; slot_count];
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let pick = if ordered.is_empty() {
            pending
                .iter()
                .enumerate()
                .min_by_key(|(_, step)| {
                    (
                        step.estimate,
                        3 - step.pattern.constants(),
                        step.source_index,
                    )
                })
                .map(|(idx, _)| idx)
        } else {
            pending
                .iter()
                .enumerate()
                .filter(|(_, step)| {
                    step.pattern.constants() == 3
                        || step.pattern.vars().any(|SlotId(idx)| bound[idx])
                })
                .min_by_key(|(_, step)| {
                    let bound_positions = step.pattern.constants()
                        + step
                            .pattern
                            .vars()
                            .filter(|SlotId(idx)| bound[*idx])
                            .count();
                    (3 - bound_positions, step.estimate, step.source_index)
                })
                .map(|(idx, _)| idx)
        };
        // Connectivity was checked up front, so a candidate always exists; fall
        // back to source order regardless.
        let step = pending.remove(pick.unwrap_or(0));
        for SlotId(idx) in step.pattern.vars() {
            bound[idx] = true;
        }
        ordered.push(step);
    }
    ordered
}

fn describe_pattern(pattern: &AnalyzedPattern) -> String {
    let render = |slot: &Slot| match slot {
        Slot::Const(node) => node.to_string(),
        Slot::Var(SlotId(idx)) => format!("${idx}"),
    };
    let [s, p, o] = &pattern.terms;
    format!("({}, {}, {})", render(s), render(p), render(o))
}

fn build_explain_tree(op: &PhysicalOp, store: &str) -> ExplainNode {
    match op {
        PhysicalOp::Insert { triples } => ExplainNode::new("Insert")
            .prop("store", store)
            .prop("triples", triples.len()),
        PhysicalOp::Delete { triples } => ExplainNode::new("Delete")
            .prop("store", store)
            .prop("triples", triples.len()),
        PhysicalOp::Select(select) => {
            let mut node = ExplainNode::new("Scan")
                .prop("pattern", describe_pattern(&select.steps[0].pattern))
                .prop("est", select.steps[0].estimate)
                .prop("channel", select.channel_capacity);
            for step in &select.steps[1..] {
                let mut join = ExplainNode::new("IndexJoin")
                    .prop("pattern", describe_pattern(&step.pattern))
                    .prop("est", step.estimate);
                join.inputs.push(node);
                node = join;
            }
            if select.distinct {
                let mut distinct = ExplainNode::new("Distinct");
                distinct.inputs.push(node);
                node = distinct;
            }
            if let Some(limit) = select.limit {
                let mut capped = ExplainNode::new("Limit").prop("rows", limit);
                capped.inputs.push(node);
                node = capped;
            }
            let mut project = ExplainNode::new("Project")
                .prop("columns", select.columns.join(","))
                .prop("store", store);
            project.inputs.push(node);
            project
        }
    }
}

fn compute_plan_hash(explain: &PlanExplain) -> u64 {
    let mut hasher = Xxh64::new(0);
    hasher.write(explain.to_string().as_bytes());
    hasher.finish()
}
