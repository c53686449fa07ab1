//! Report sinks.

use std::io::{self, Write};

use serde::Serialize;

use super::outcome::{RunSummary, StatementReport, StatementStatus};
use super::script::{Batch, ScriptStatement};

/// Receives one record per statement, in order.
///
/// The runner never inspects how records are rendered. I/O errors are
/// logged by the runner and do not stop the run.
pub trait ReportSink {
    /// Called once before the first statement.
    fn begin(&mut self, batch: &Batch) -> io::Result<()>;

    /// Called right before a statement enters the pipeline.
    fn started(&mut self, _statement: &ScriptStatement) -> io::Result<()> {
        Ok(())
    }

    /// Called once per statement, including skipped ones.
    fn record(&mut self, report: &StatementReport) -> io::Result<()>;

    /// Called once after the last statement.
    fn finish(&mut self, summary: &RunSummary) -> io::Result<()>;
}

/// Structural lines of the plain report that a terminal may decorate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    /// `Processing file ..` and `Processing statement (i/N):`.
    Heading,
    /// The closing `OK` of a successful statement.
    Success,
    /// The `[FAIL] stage: message` line.
    Failure,
    /// The `[SKIPPED] ..` line of a statement never attempted.
    Skipped,
}

type Decorator = Box<dyn Fn(Marker, &str) -> String>;

/// Plain text report stream.
///
/// ```text
/// Processing file script.bql
///
/// Processing statement (1/1):
/// SELECT ?o WHERE (a, b, ?o)
///
/// Result:
/// +----+
/// | ?o |
/// +----+
/// | c  |
/// +----+
/// OK
/// ```
pub struct PlainReport<W: Write> {
    out: W,
    decorate: Option<Decorator>,
}

impl<W: Write> PlainReport<W> {
    /// Writes the report to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            decorate: None,
        }
    }

    /// Writes the report to `out`, passing every [`Marker`] line through
    /// `decorate`. Statement text and result tables are never decorated.
    pub fn decorated(out: W, decorate: impl Fn(Marker, &str) -> String + 'static) -> Self {
        Self {
            out,
            decorate: Some(Box::new(decorate)),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn marker(&mut self, marker: Marker, line: &str) -> io::Result<()> {
        match &self.decorate {
            Some(decorate) => writeln!(self.out, "{}", decorate(marker, line)),
            None => writeln!(self.out, "{line}"),
        }
    }
}

impl<W: Write> ReportSink for PlainReport<W> {
    fn begin(&mut self, batch: &Batch) -> io::Result<()> {
        self.marker(Marker::Heading, &format!("Processing file {}", batch.source()))?;
        writeln!(self.out)
    }

    fn record(&mut self, report: &StatementReport) -> io::Result<()> {
        self.marker(
            Marker::Heading,
            &format!("Processing statement ({}/{}):", report.position, report.total),
        )?;
        writeln!(self.out, "{}", report.text)?;
        writeln!(self.out)?;
        match &report.status {
            StatementStatus::Succeeded { table } => {
                writeln!(self.out, "Result:")?;
                if !table.is_empty() {
                    write!(self.out, "{table}")?;
                }
                self.marker(Marker::Success, "OK")?;
            }
            StatementStatus::Failed { failure } => {
                self.marker(
                    Marker::Failure,
                    &format!("[FAIL] {}: {}", failure.stage, failure.message),
                )?;
            }
            StatementStatus::NotAttempted => {
                self.marker(
                    Marker::Skipped,
                    "[SKIPPED] statement not attempted (run cancelled)",
                )?;
            }
        }
        writeln!(self.out)?;
        self.out.flush()
    }

    fn finish(&mut self, _summary: &RunSummary) -> io::Result<()> {
        self.out.flush()
    }
}

/// JSON lines: one object per statement followed by a summary object.
pub struct JsonReport<W: Write> {
    out: W,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonLine<'a> {
    Statement(&'a StatementReport),
    Summary(&'a RunSummary),
}

impl<W: Write> JsonReport<W> {
    /// Writes JSON lines to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, line: JsonLine<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, &line)?;
        writeln!(self.out)
    }
}

impl<W: Write> ReportSink for JsonReport<W> {
    fn begin(&mut self, _batch: &Batch) -> io::Result<()> {
        Ok(())
    }

    fn record(&mut self, report: &StatementReport) -> io::Result<()> {
        self.line(JsonLine::Statement(report))
    }

    fn finish(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.line(JsonLine::Summary(summary))?;
        self.out.flush()
    }
}
