//! In-memory triple store backed by three ordered indexes.

use std::collections::BTreeSet;
use std::fs;
use std::ops::Bound;
use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::{Lookup, Node, Store, Triple};
use crate::query::parser::parse_ground_triple;
use crate::types::{Result, TriqError};

type Key = (Node, Node, Node);

#[derive(Default)]
struct Indexes {
    spo: BTreeSet<Key>,
    pos: BTreeSet<Key>,
    osp: BTreeSet<Key>,
}

fn spo(t: &Triple) -> Key {
    (t.subject.clone(), t.predicate.clone(), t.object.clone())
}

fn pos(t: &Triple) -> Key {
    (t.predicate.clone(), t.object.clone(), t.subject.clone())
}

fn osp(t: &Triple) -> Key {
    (t.object.clone(), t.subject.clone(), t.predicate.clone())
}

impl Indexes {
    fn insert(&mut self, t: &Triple) -> bool {
        let added = self.spo.insert(spo(t));
        if added {
            self.pos.insert(pos(t));
            self.osp.insert(osp(t));
        }
        added
    }

    fn remove(&mut self, t: &Triple) -> bool {
        let removed = self.spo.remove(&spo(t));
        if removed {
            self.pos.remove(&pos(t));
            self.osp.remove(&osp(t));
        }
        removed
    }

    /// Matches for `lookup` in index order, strictly after `after` if given.
    fn matches<'a>(
        &'a self,
        lookup: &'a Lookup,
        after: Option<&Triple>,
    ) -> Box<dyn Iterator<Item = Triple> + 'a> {
        match (&lookup.subject, &lookup.predicate, &lookup.object) {
            (Some(s), p, _) => Box::new(
                prefix_range(&self.spo, Some(s), p.as_ref(), after.map(spo))
                    .map(|(s, p, o)| Triple::new(s.clone(), p.clone(), o.clone()))
                    .filter(move |t| lookup.matches(t)),
            ),
            (None, Some(p), o) => Box::new(
                prefix_range(&self.pos, Some(p), o.as_ref(), after.map(pos))
                    .map(|(p, o, s)| Triple::new(s.clone(), p.clone(), o.clone())),
            ),
            (None, None, Some(o)) => Box::new(
                prefix_range(&self.osp, Some(o), None, after.map(osp))
                    .map(|(o, s, p)| Triple::new(s.clone(), p.clone(), o.clone())),
            ),
            (None, None, None) => Box::new(
                prefix_range(&self.spo, None, None, after.map(spo))
                    .map(|(s, p, o)| Triple::new(s.clone(), p.clone(), o.clone())),
            ),
        }
    }
}

/// Range over `index` for keys starting with `first` (and `second`, if
/// given), resuming after `after` when set.
fn prefix_range<'a>(
    index: &'a BTreeSet<Key>,
    first: Option<&'a Node>,
    second: Option<&'a Node>,
    after: Option<Key>,
) -> impl Iterator<Item = &'a Key> + 'a {
    let lower = match (after, first) {
        (Some(cursor), _) => Bound::Excluded(cursor),
        (None, Some(first)) => Bound::Included((
            first.clone(),
            second.cloned().unwrap_or_else(|| Node::new("")),
            Node::new(""),
        )),
        (None, None) => Bound::Unbounded,
    };
    index
        .range((lower, Bound::Unbounded))
        .take_while(move |key| {
            first.map_or(true, |f| &key.0 == f) && second.map_or(true, |s| &key.1 == s)
        })
}

/// Process-local store; everything lives behind a single reader/writer lock.
pub struct MemoryStore {
    name: String,
    read_only: bool,
    inner: RwLock<Indexes>,
}

impl MemoryStore {
    /// Creates an empty writable store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            read_only: false,
            inner: RwLock::new(Indexes::default()),
        }
    }

    /// Marks the store read-only. Data loaded beforehand is kept.
    pub fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Loads ground triples from a seed file, one `(s, p, o)` per line.
    ///
    /// Blank lines and lines starting with `#` are ignored.
    pub fn seed_from(&self, path: &Path) -> Result<usize> {
        let contents = fs::read_to_string(path)?;
        let mut triples = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let triple = parse_ground_triple(trimmed).map_err(|message| TriqError::Seed {
                path: path.to_path_buf(),
                line: idx + 1,
                message,
            })?;
            triples.push(triple);
        }
        let mut inner = self.inner.write();
        let added = triples.iter().filter(|t| inner.insert(t)).count();
        info!(store = %self.name, path = %path.display(), added, "storage.memory.seeded");
        Ok(added)
    }
}

impl Store for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn insert(&self, triples: &[Triple]) -> Result<usize> {
        if self.read_only {
            return Err(TriqError::ReadOnly(self.name.clone()));
        }
        let mut inner = self.inner.write();
        let added = triples.iter().filter(|t| inner.insert(t)).count();
        debug!(store = %self.name, requested = triples.len(), added, "storage.memory.insert");
        Ok(added)
    }

    fn delete(&self, triples: &[Triple]) -> Result<usize> {
        if self.read_only {
            return Err(TriqError::ReadOnly(self.name.clone()));
        }
        let mut inner = self.inner.write();
        let removed = triples.iter().filter(|t| inner.remove(t)).count();
        debug!(store = %self.name, requested = triples.len(), removed, "storage.memory.delete");
        Ok(removed)
    }

    fn scan(&self, lookup: &Lookup) -> Result<Vec<Triple>> {
        Ok(self.inner.read().matches(lookup, None).collect())
    }

    fn scan_page(&self, lookup: &Lookup, after: Option<&Triple>, limit: usize) -> Result<Vec<Triple>> {
        Ok(self.inner.read().matches(lookup, after).take(limit).collect())
    }

    fn count(&self, lookup: &Lookup) -> Result<usize> {
        if lookup.bound() == 0 {
            return Ok(self.len());
        }
        Ok(self.scan(lookup)?.len())
    }

    fn len(&self) -> usize {
        self.inner.read().spo.len()
    }
}
