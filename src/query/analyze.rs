#![forbid(unsafe_code)]

//! Semantic validation of parsed statements.
//!
//! Variables are resolved to dense slot ids so the planner and executor work
//! with fixed-size binding rows instead of name lookups. Anonymous wildcards
//! each receive their own slot, named `?_1`, `?_2`, ... in order of
//! appearance. User variables may not start with `_`, so the two never clash.

use rustc_hash::FxHashMap;

use crate::storage::{Node, Triple};

use super::ast::{Projection, SelectStatement, Statement, Term, TriplePattern, Var};
use super::errors::AnalyzerError;

/// Maximum number of WHERE patterns per SELECT.
pub const MAX_PATTERNS: usize = 64;
/// Maximum number of triples a single INSERT/DELETE may carry.
pub const MAX_TRIPLES: usize = 10_000;

/// Convenience alias for analyzer results.
pub type AnalyzeResult<T> = std::result::Result<T, AnalyzerError>;

/// Dense index of a binding column.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SlotId(pub usize);

/// Resolved term of an analyzed pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Slot {
    /// Must equal this node.
    Const(Node),
    /// Binds (or must agree with) this slot.
    Var(SlotId),
}

/// Pattern with variables resolved to slots.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnalyzedPattern {
    /// Subject, predicate, object.
    pub terms: [Slot; 3],
}

impl AnalyzedPattern {
    /// Slots referenced by this pattern.
    pub fn vars(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.terms.iter().filter_map(|slot| match slot {
            Slot::Var(id) => Some(*id),
            Slot::Const(_) => None,
        })
    }

    /// Number of constant positions.
    pub fn constants(&self) -> usize {
        self.terms
            .iter()
            .filter(|slot| matches!(slot, Slot::Const(_)))
            .count()
    }
}

/// Validated SELECT.
#[derive(Clone, Debug)]
pub struct AnalyzedSelect {
    /// Column name of every slot, indexed by [`SlotId`].
    pub slots: Vec<String>,
    /// Patterns in source order.
    pub patterns: Vec<AnalyzedPattern>,
    /// Slots emitted as output columns.
    pub projection: Vec<SlotId>,
    /// Remove duplicate output rows.
    pub distinct: bool,
    /// Row cap.
    pub limit: Option<usize>,
}

/// Statement ready for planning.
#[derive(Clone, Debug)]
pub enum AnalyzedStatement {
    /// Ground triples to add.
    Insert(Vec<Triple>),
    /// Ground triples to remove.
    Delete(Vec<Triple>),
    /// Query.
    Select(AnalyzedSelect),
}

impl AnalyzedStatement {
    /// Statement keyword, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzedStatement::Insert(_) => "INSERT",
            AnalyzedStatement::Delete(_) => "DELETE",
            AnalyzedStatement::Select(_) => "SELECT",
        }
    }
}

/// Validates `statement` and resolves its variables.
pub fn analyze(statement: Statement) -> AnalyzeResult<AnalyzedStatement> {
    match statement {
        Statement::Insert(triples) => ground_all("INSERT", triples).map(AnalyzedStatement::Insert),
        Statement::Delete(triples) => ground_all("DELETE", triples).map(AnalyzedStatement::Delete),
        Statement::Select(select) => analyze_select(select).map(AnalyzedStatement::Select),
    }
}

fn ground_all(statement: &'static str, triples: Vec<TriplePattern>) -> AnalyzeResult<Vec<Triple>> {
    if triples.len() > MAX_TRIPLES {
        return Err(AnalyzerError::TooManyTriples {
            count: triples.len(),
            max: MAX_TRIPLES,
        });
    }
    let ground = |term: Term| match term {
        Term::Node(node) => Ok(node),
        Term::Var(Var(name)) => Err(AnalyzerError::VariableInData {
            statement,
            term: format!("?{name}"),
        }),
        Term::Anonymous => Err(AnalyzerError::VariableInData {
            statement,
            term: "?".to_string(),
        }),
    };
    triples
        .into_iter()
        .map(|t| {
            Ok(Triple {
                subject: ground(t.subject)?,
                predicate: ground(t.predicate)?,
                object: ground(t.object)?,
            })
        })
        .collect()
}

#[derive(Default)]
struct SlotTable {
    names: Vec<String>,
    by_var: FxHashMap<String, SlotId>,
    anonymous: usize,
}

impl SlotTable {
    fn resolve(&mut self, term: Term) -> AnalyzeResult<Slot> {
        match term {
            Term::Node(node) => Ok(Slot::Const(node)),
            Term::Var(Var(name)) => {
                if let Some(id) = self.by_var.get(&name) {
                    return Ok(Slot::Var(*id));
                }
                reject_reserved(&name)?;
                let id = self.push(format!("?{name}"));
                self.by_var.insert(name, id);
                Ok(Slot::Var(id))
            }
            Term::Anonymous => {
                self.anonymous += 1;
                Ok(Slot::Var(self.push(format!("?_{}", self.anonymous))))
            }
        }
    }

    fn push(&mut self, name: String) -> SlotId {
        let id = SlotId(self.names.len());
        self.names.push(name);
        id
    }
}

fn reject_reserved(name: &str) -> AnalyzeResult<()> {
    if name.starts_with('_') {
        return Err(AnalyzerError::ReservedVariable {
            var: name.to_string(),
        });
    }
    Ok(())
}

fn analyze_select(select: SelectStatement) -> AnalyzeResult<AnalyzedSelect> {
    if select.patterns.len() > MAX_PATTERNS {
        return Err(AnalyzerError::TooManyPatterns {
            count: select.patterns.len(),
            max: MAX_PATTERNS,
        });
    }

    let mut table = SlotTable::default();
    let patterns = select
        .patterns
        .into_iter()
        .map(|p| {
            Ok(AnalyzedPattern {
                terms: [
                    table.resolve(p.subject)?,
                    table.resolve(p.predicate)?,
                    table.resolve(p.object)?,
                ],
            })
        })
        .collect::<AnalyzeResult<Vec<_>>>()?;

    let projection = match select.projection {
        Projection::All => {
            if table.names.is_empty() {
                return Err(AnalyzerError::EmptyProjection);
            }
            (0..table.names.len()).map(SlotId).collect()
        }
        Projection::Vars(vars) => {
            let mut out: Vec<SlotId> = Vec::with_capacity(vars.len());
            for Var(name) in vars {
                reject_reserved(&name)?;
                let Some(id) = table.by_var.get(&name).copied() else {
                    return Err(AnalyzerError::UnboundVariable { var: name });
                };
                if out.contains(&id) {
                    return Err(AnalyzerError::DuplicateProjection { var: name });
                }
                out.push(id);
            }
            out
        }
    };

    Ok(AnalyzedSelect {
        slots: table.names,
        patterns,
        projection,
        distinct: select.distinct,
        limit: select.limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse_statement;

    fn analyze_text(text: &str) -> AnalyzeResult<AnalyzedStatement> {
        analyze(parse_statement(text).expect("parse"))
    }

    #[test]
    fn insert_must_be_ground() {
        let err = analyze_text("INSERT (a, ?b, c)").expect_err("variable in insert");
        assert_eq!(err.code(), "VariableInData");
        let err = analyze_text("DELETE (a, b, ?)").expect_err("wildcard in delete");
        assert_eq!(
            err,
            AnalyzerError::VariableInData {
                statement: "DELETE",
                term: "?".into()
            }
        );
        assert!(matches!(
            analyze_text("INSERT (a, b, c)"),
            Ok(AnalyzedStatement::Insert(triples)) if triples == vec![Triple::new("a", "b", "c")]
        ));
    }

    #[test]
    fn star_projects_named_and_anonymous_slots_in_order() {
        let Ok(AnalyzedStatement::Select(select)) =
            analyze_text("SELECT * WHERE (?s, knows, ?), (?s, ?, ?o)")
        else {
            panic!("expected select");
        };
        assert_eq!(select.slots, vec!["?s", "?_1", "?_2", "?o"]);
        assert_eq!(
            select.projection,
            vec![SlotId(0), SlotId(1), SlotId(2), SlotId(3)]
        );
        assert_eq!(select.patterns[1].terms[0], Slot::Var(SlotId(0)));
    }

    #[test]
    fn projection_errors_are_coded() {
        let err = analyze_text("SELECT ?x WHERE (?y, p, o)").expect_err("unbound");
        assert_eq!(err.code(), "UnboundVariable");
        let err = analyze_text("SELECT ?x, ?x WHERE (?x, p, o)").expect_err("duplicate");
        assert_eq!(err.code(), "DuplicateProjection");
        let err = analyze_text("SELECT * WHERE (a, b, c)").expect_err("nothing to project");
        assert_eq!(err, AnalyzerError::EmptyProjection);
    }

    #[test]
    fn underscore_variables_cannot_shadow_wildcard_columns() {
        let err = analyze_text("SELECT * WHERE (?_1, b, ?)").expect_err("reserved in pattern");
        assert_eq!(
            err,
            AnalyzerError::ReservedVariable { var: "_1".into() }
        );
        let err = analyze_text("SELECT ?_x WHERE (?s, b, ?)").expect_err("reserved in projection");
        assert_eq!(err.code(), "ReservedVariable");

        let Ok(AnalyzedStatement::Select(select)) = analyze_text("SELECT * WHERE (?x_1, b, ?)")
        else {
            panic!("inner underscores are fine");
        };
        assert_eq!(select.slots, vec!["?x_1", "?_1"]);
    }

    #[test]
    fn pattern_budget_is_enforced() {
        let patterns = vec!["(?x, p, o)"; MAX_PATTERNS + 1].join(", ");
        let err = analyze_text(&format!("SELECT ?x WHERE {patterns}")).expect_err("too many");
        assert_eq!(
            err,
            AnalyzerError::TooManyPatterns {
                count: MAX_PATTERNS + 1,
                max: MAX_PATTERNS
            }
        );
    }
}
