//! Abstract syntax produced by the parser.
//!
//! Nothing here is validated beyond grammar; the analyzer enforces that write
//! data is ground and that projections are bound.

use crate::storage::Node;

use super::errors::Span;

/// Identifier of a named variable, without the leading `?`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(pub String);

/// One position of a triple pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Term {
    /// Constant value.
    Node(Node),
    /// Named variable.
    Var(Var),
    /// Anonymous wildcard `?`.
    Anonymous,
}

/// `(subject, predicate, object)` as written in the statement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TriplePattern {
    /// Subject term.
    pub subject: Term,
    /// Predicate term.
    pub predicate: Term,
    /// Object term.
    pub object: Term,
    /// Location of the whole parenthesised group.
    pub span: Span,
}

impl TriplePattern {
    /// Terms in subject, predicate, object order.
    pub fn terms(&self) -> [&Term; 3] {
        [&self.subject, &self.predicate, &self.object]
    }
}

/// Output columns requested by a SELECT.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Projection {
    /// `*`: every variable, in order of first appearance.
    All,
    /// Explicit variable list.
    Vars(Vec<Var>),
}

/// Parsed `SELECT` statement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SelectStatement {
    /// Whether duplicate rows are removed.
    pub distinct: bool,
    /// Requested columns.
    pub projection: Projection,
    /// `WHERE` patterns, in source order.
    pub patterns: Vec<TriplePattern>,
    /// Optional row cap.
    pub limit: Option<usize>,
}

/// Top-level statement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Statement {
    /// `INSERT (s, p, o), ...`
    Insert(Vec<TriplePattern>),
    /// `DELETE (s, p, o), ...`
    Delete(Vec<TriplePattern>),
    /// `SELECT ... WHERE ...`
    Select(SelectStatement),
}

impl Statement {
    /// Statement keyword, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Insert(_) => "INSERT",
            Statement::Delete(_) => "DELETE",
            Statement::Select(_) => "SELECT",
        }
    }
}
