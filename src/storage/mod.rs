#![forbid(unsafe_code)]

//! Triple store abstraction consumed by the planner and executor.
//!
//! Statements never reach a store through ambient state: a single
//! [`StoreHandle`] is created for a run and threaded explicitly through
//! every plan.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::Result;

mod memory;

pub use memory::MemoryStore;

/// Shared, mutable handle to the store used for a whole batch run.
pub type StoreHandle = Arc<dyn Store>;

/// A subject, predicate or object value.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Node(pub String);

impl Node {
    /// Creates a node from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw text of the node.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns true when `ch` may appear in an unquoted identifier.
pub fn is_bare_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':' | '/' | '#' | '@')
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.0.is_empty() && self.0.chars().all(is_bare_char) {
            return f.write_str(&self.0);
        }
        f.write_str("\"")?;
        for ch in self.0.chars() {
            match ch {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                other => write!(f, "{other}")?,
            }
        }
        f.write_str("\"")
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node(value.to_owned())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node(value)
    }
}

/// A single fact held by the store.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// Subject node.
    pub subject: Node,
    /// Predicate node.
    pub predicate: Node,
    /// Object node.
    pub object: Node,
}

impl Triple {
    /// Builds a triple from three node-like values.
    pub fn new(subject: impl Into<Node>, predicate: impl Into<Node>, object: impl Into<Node>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

/// Partially bound triple used to scan the store. `None` matches anything.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Lookup {
    /// Required subject, if bound.
    pub subject: Option<Node>,
    /// Required predicate, if bound.
    pub predicate: Option<Node>,
    /// Required object, if bound.
    pub object: Option<Node>,
}

impl Lookup {
    /// Lookup matching every triple.
    pub fn any() -> Self {
        Self::default()
    }

    /// Number of bound positions.
    pub fn bound(&self) -> usize {
        [&self.subject, &self.predicate, &self.object]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Returns true when `triple` satisfies every bound position.
    pub fn matches(&self, triple: &Triple) -> bool {
        fn ok(slot: &Option<Node>, node: &Node) -> bool {
            slot.as_ref().map_or(true, |want| want == node)
        }
        ok(&self.subject, &triple.subject)
            && ok(&self.predicate, &triple.predicate)
            && ok(&self.object, &triple.object)
    }
}

/// Pluggable, mutable triple store.
///
/// Implementations own their internal concurrency control; callers never lock
/// around a store.
pub trait Store: Send + Sync {
    /// Human-readable identity used in diagnostics.
    fn name(&self) -> &str;

    /// Whether writes are rejected.
    fn is_read_only(&self) -> bool;

    /// Adds triples, returning how many were not already present.
    fn insert(&self, triples: &[Triple]) -> Result<usize>;

    /// Removes triples, returning how many were present.
    fn delete(&self, triples: &[Triple]) -> Result<usize>;

    /// Returns every triple matching `lookup`, in a stable order.
    fn scan(&self, lookup: &Lookup) -> Result<Vec<Triple>>;

    /// Returns at most `limit` triples matching `lookup` that come after
    /// `after` in [`Store::scan`] order, or from the start when `after` is
    /// `None`.
    ///
    /// The default re-runs the full scan for every page; stores with ordered
    /// indexes should seek to the cursor instead.
    fn scan_page(&self, lookup: &Lookup, after: Option<&Triple>, limit: usize) -> Result<Vec<Triple>> {
        let all = self.scan(lookup)?;
        let start = match after {
            Some(cursor) => all
                .iter()
                .position(|triple| triple == cursor)
                .map_or(all.len(), |idx| idx + 1),
            None => 0,
        };
        Ok(all.into_iter().skip(start).take(limit).collect())
    }

    /// Returns the number of triples matching `lookup`.
    fn count(&self, lookup: &Lookup) -> Result<usize> {
        Ok(self.scan(lookup)?.len())
    }

    /// Total number of triples held.
    fn len(&self) -> usize;

    /// Whether the store holds no triples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
