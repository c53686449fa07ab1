//! Script loading and the per-batch concurrency parameter.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use super::error::{BatchError, ChannelSizeError, Result};

/// One statement of a script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScriptStatement {
    /// 1-based ordinal within the batch.
    pub position: usize,
    /// 1-based line in the source script.
    pub line: usize,
    /// Trimmed statement text.
    pub text: String,
}

/// Ordered statements read from one source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    source: String,
    statements: Vec<ScriptStatement>,
}

impl Batch {
    /// Splits script text into statements.
    ///
    /// Blank lines and lines whose first non-whitespace character is `#` are
    /// dropped; every other line is trimmed and becomes one statement.
    pub fn parse(source: impl Into<String>, text: &str) -> Self {
        let statements = text
            .lines()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let trimmed = raw.trim();
                (!trimmed.is_empty() && !trimmed.starts_with('#')).then(|| (idx + 1, trimmed))
            })
            .enumerate()
            .map(|(ordinal, (line, text))| ScriptStatement {
                position: ordinal + 1,
                line,
                text: text.to_string(),
            })
            .collect();
        Self {
            source: source.into(),
            statements,
        }
    }

    /// Reads and splits the script at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| BatchError::source_failure(path, err))?;
        Ok(Self::parse(path.display().to_string(), &text))
    }

    /// Where the statements came from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the script held no statements.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statements in ordinal order.
    pub fn iter(&self) -> std::slice::Iter<'_, ScriptStatement> {
        self.statements.iter()
    }

    /// Statements as a slice.
    pub fn statements(&self) -> &[ScriptStatement] {
        &self.statements
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a ScriptStatement;
    type IntoIter = std::slice::Iter<'a, ScriptStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

/// Producer/consumer buffer capacity applied to every statement of a batch.
/// `0` asks the engine for its default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChannelSize(pub usize);

impl ChannelSize {
    /// Capacity used when the parameter is `0`.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Largest capacity a bounded channel can hold.
    pub const MAX_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

    /// Effective capacity; never zero.
    pub fn capacity(self) -> usize {
        if self.0 == 0 {
            Self::DEFAULT_CAPACITY
        } else {
            self.0
        }
    }
}

impl FromStr for ChannelSize {
    type Err = ChannelSizeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ChannelSizeError {
            value: s.to_string(),
        };
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        match s.parse::<usize>() {
            Ok(value) if value <= Self::MAX_CAPACITY => Ok(ChannelSize(value)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ChannelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
