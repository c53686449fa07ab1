use indicatif::{ProgressBar, ProgressStyle};
use nu_ansi_term::{Color, Style};
use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};
use triq::batch::{
    Batch, Marker, PlainReport, ReportSink, RunSummary, ScriptStatement, StatementReport,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Theme {
    Auto,
    Light,
    Dark,
    Plain,
}

pub struct Ui {
    palette: Palette,
    paint: bool,
    quiet: bool,
    interactive: bool,
    spinner_style: ProgressStyle,
}

impl Ui {
    pub fn new(theme: Theme, quiet: bool) -> Self {
        let stdout_is_tty = std::io::stdout().is_terminal();
        let paint = match theme {
            Theme::Plain => false,
            Theme::Auto | Theme::Light | Theme::Dark => stdout_is_tty,
        };

        #[cfg(windows)]
        if paint {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        let palette = match theme {
            Theme::Plain => Palette::plain(),
            Theme::Light => Palette::light(),
            Theme::Dark | Theme::Auto => Palette::dark(),
        };

        let spinner_style = ProgressStyle::with_template("{prefix} {spinner} {msg}")
            .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        Self {
            palette,
            paint,
            quiet,
            interactive: stdout_is_tty && std::io::stderr().is_terminal(),
            spinner_style,
        }
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.paint {
            self.palette.success.paint(SUCCESS_ICON)
        } else {
            Style::new().paint(SUCCESS_ICON)
        };
        eprintln!("{prefix} {message}");
    }

    pub fn warn(&self, message: &str) {
        if self.quiet {
            eprintln!("{message}");
            return;
        }
        let prefix = if self.paint {
            self.palette.warn.paint(WARNING_ICON)
        } else {
            Style::new().paint(WARNING_ICON)
        };
        eprintln!("{prefix} {message}");
    }

    pub fn summary(&self, summary: &RunSummary) {
        let mut line = format!(
            "{} of {} statements succeeded, {} failed",
            summary.succeeded, summary.total, summary.failed
        );
        if summary.cancelled {
            line.push_str(&format!(", {} not attempted", summary.not_attempted));
        }
        line.push_str(&format!(" in {}", format_duration(summary.elapsed)));
        if summary.cancelled {
            self.warn(&format!("run cancelled: {line}"));
        } else {
            self.success(&line);
        }
    }

    pub fn task<'a>(&'a self, label: impl Into<String>) -> TaskGuard<'a> {
        let label = label.into();
        let pb = if self.quiet || !self.interactive {
            None
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(self.spinner_style.clone());
            let prefix = if self.paint {
                self.palette.info.paint(PROGRESS_ICON).to_string()
            } else {
                PROGRESS_ICON.to_string()
            };
            pb.set_prefix(prefix);
            pb.set_message(label.clone());
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        };
        TaskGuard {
            ui: self,
            label,
            start: Instant::now(),
            finished: false,
            pb,
        }
    }

    /// Report writer for `out`, coloured when the terminal allows it.
    fn plain_report<W: Write>(&self, out: W) -> PlainReport<W> {
        if !self.paint {
            return PlainReport::new(out);
        }
        let palette = self.palette;
        PlainReport::decorated(out, move |marker, line| {
            let style = match marker {
                Marker::Heading => palette.heading,
                Marker::Success => palette.success,
                Marker::Failure => palette.warn,
                Marker::Skipped => palette.info,
            };
            style.paint(line).to_string()
        })
    }
}

pub struct TaskGuard<'a> {
    ui: &'a Ui,
    label: String,
    start: Instant,
    finished: bool,
    pb: Option<ProgressBar>,
}

impl<'a> TaskGuard<'a> {
    pub fn finish(mut self) -> Duration {
        self.finished = true;
        let elapsed = self.start.elapsed();
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
        elapsed
    }
}

impl<'a> Drop for TaskGuard<'a> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let elapsed = format_duration(self.start.elapsed());
        if let Some(pb) = self.pb.take() {
            pb.abandon_with_message(format!("{} interrupted after {elapsed}", self.label));
        } else if !self.ui.quiet {
            self.ui
                .warn(&format!("{} interrupted after {elapsed}", self.label));
        }
    }
}

/// Text report for the terminal: the plain layout, painted, with a spinner
/// while each statement runs.
pub struct ConsoleReport<'a, W: Write> {
    ui: &'a Ui,
    report: PlainReport<W>,
    task: Option<TaskGuard<'a>>,
}

impl<'a, W: Write> ConsoleReport<'a, W> {
    pub fn new(ui: &'a Ui, out: W) -> Self {
        Self {
            ui,
            report: ui.plain_report(out),
            task: None,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.report.into_inner()
    }
}

impl<'a, W: Write> ReportSink for ConsoleReport<'a, W> {
    fn begin(&mut self, batch: &Batch) -> io::Result<()> {
        self.report.begin(batch)
    }

    fn started(&mut self, statement: &ScriptStatement) -> io::Result<()> {
        self.task = Some(self.ui.task(format!(
            "statement {} (line {})",
            statement.position, statement.line
        )));
        Ok(())
    }

    fn record(&mut self, report: &StatementReport) -> io::Result<()> {
        if let Some(task) = self.task.take() {
            task.finish();
        }
        self.report.record(report)
    }

    fn finish(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.report.finish(summary)?;
        self.ui.summary(summary);
        Ok(())
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs_f64() >= 1.0 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{:.0}ms", duration.as_secs_f64() * 1_000.0)
    }
}

#[derive(Clone, Copy)]
struct Palette {
    heading: Style,
    info: Style,
    success: Style,
    warn: Style,
}

impl Palette {
    fn dark() -> Self {
        Self {
            heading: Style::new().fg(Color::Purple).bold(),
            info: Style::new().fg(Color::LightCyan),
            success: Style::new().fg(Color::LightGreen).bold(),
            warn: Style::new().fg(Color::Yellow).bold(),
        }
    }

    fn light() -> Self {
        Self {
            heading: Style::new().fg(Color::Blue).bold(),
            info: Style::new().fg(Color::Purple),
            success: Style::new().fg(Color::Green).bold(),
            warn: Style::new().fg(Color::Red).bold(),
        }
    }

    fn plain() -> Self {
        Self {
            heading: Style::new(),
            info: Style::new(),
            success: Style::new(),
            warn: Style::new(),
        }
    }
}

const SUCCESS_ICON: &str = "✔";
const WARNING_ICON: &str = "⚠";
const PROGRESS_ICON: &str = "▶";
