//! Tabular statement results.

use std::fmt;

use serde::Serialize;

use crate::storage::Node;

/// Ordered rows under named columns. May be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    /// Column headers.
    pub columns: Vec<String>,
    /// Row values, each parallel to `columns`.
    pub rows: Vec<Vec<Node>>,
}

impl ResultTable {
    /// Table with headers and no rows.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of `column` in row order, if the column exists.
    pub fn column(&self, column: &str) -> Option<Vec<&Node>> {
        let idx = self.columns.iter().position(|c| c == column)?;
        Some(self.rows.iter().filter_map(|row| row.get(idx)).collect())
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (idx, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(idx) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        let rule = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            for width in &widths {
                write!(f, "+{}", "-".repeat(width + 2))?;
            }
            writeln!(f, "+")
        };
        let line = |f: &mut fmt::Formatter<'_>, values: &[String]| -> fmt::Result {
            for (value, &width) in values.iter().zip(&widths) {
                write!(f, "| {value:<width$} ")?;
            }
            writeln!(f, "|")
        };

        rule(f)?;
        line(f, &self.columns)?;
        rule(f)?;
        for row in &cells {
            line(f, row)?;
        }
        rule(f)
    }
}
