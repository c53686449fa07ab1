//! Binary entry point for the triq batch runner.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use triq::{
    batch::{Batch, BatchError, BatchRunner, ChannelSize, JsonReport, ReportSink, RunSummary},
    logging::{init_logging, DEFAULT_LEVEL, LOG_ENV},
    storage::{MemoryStore, StoreHandle},
    types::TriqError,
};

use config::{CliConfig, ConfigError};
use ui::{ConsoleReport, Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "triq",
    version,
    about = "Run scripts of triple pattern statements against a shared store",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "TRIQ_CONFIG",
        value_name = "PATH",
        help = "CLI config file (defaults to <config dir>/triq/cli.toml)"
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, help = "Report format")]
    format: Option<OutputFormat>,

    #[arg(long, global = true, value_enum, help = "Colour theme for text reports")]
    theme: Option<ThemeArg>,

    #[arg(long, global = true, help = "Suppress spinners and the closing summary")]
    quiet: bool,

    #[arg(
        long,
        global = true,
        value_name = "FILTER",
        help = "Log filter for stderr, e.g. debug or triq::query=trace"
    )]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Run every statement of a script, in order")]
    Run(RunCmd),
}

#[derive(Args, Debug)]
struct RunCmd {
    #[arg(
        long = "channel_size",
        visible_alias = "channel-size",
        value_name = "N",
        help = "Producer/consumer buffer size per statement (0 = engine default)"
    )]
    channel_size: Option<ChannelSize>,

    #[arg(long, value_name = "FILE", help = "Load (s, p, o) triples into the store first")]
    seed: Option<PathBuf>,

    #[arg(long, help = "Reject INSERT and DELETE statements")]
    read_only: bool,

    #[arg(value_name = "FILE", help = "Script to run")]
    script: PathBuf,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ThemeArg {
    Auto,
    Light,
    Dark,
    Plain,
}

impl From<ThemeArg> for Theme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Auto => Theme::Auto,
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Plain => Theme::Plain,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error("{0}")]
    Logging(TriqError),
}

impl CliError {
    /// `2` for usage mistakes (matching clap), `1` for everything else.
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(err) if err.is_usage() => 2,
            CliError::Logging(_) => 2,
            _ => 1,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = CliConfig::load(cli.config.clone())?;
    let defaults = config.run();

    let level = cli
        .log_level
        .clone()
        .or_else(|| std::env::var(LOG_ENV).ok())
        .or_else(|| defaults.log_level.clone())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());
    init_logging(&level).map_err(CliError::Logging)?;
    debug!(config = ?config.path(), level = %level, "cli.config.loaded");

    let format = cli.format.or(defaults.format).unwrap_or(OutputFormat::Text);
    let theme = cli.theme.or(defaults.theme).unwrap_or(ThemeArg::Auto);

    match cli.command {
        Command::Run(cmd) => {
            let channel = cmd
                .channel_size
                .or(defaults.channel_size.map(ChannelSize))
                .unwrap_or_default();
            let batch = Batch::load(&cmd.script)?;
            let store = open_store(&cmd)?;
            let ui = Ui::new(theme.into(), cli.quiet);
            run_batch(&batch, &store, channel, format, &ui).await;
        }
    }
    Ok(())
}

fn open_store(cmd: &RunCmd) -> Result<StoreHandle, BatchError> {
    let mut store = MemoryStore::new("default");
    if let Some(seed) = cmd.seed.as_deref() {
        let loaded = store.seed_from(seed)?;
        debug!(seed = %seed.display(), triples = loaded, "cli.store.seeded");
    }
    if cmd.read_only {
        store = store.into_read_only();
    }
    Ok(Arc::new(store))
}

async fn run_batch(
    batch: &Batch,
    store: &StoreHandle,
    channel: ChannelSize,
    format: OutputFormat,
    ui: &Ui,
) -> RunSummary {
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("cli.run.interrupted");
                cancel.cancel();
            }
        })
    };

    let stdout = io::stdout();
    let mut sink: Box<dyn ReportSink + '_> = match format {
        OutputFormat::Text => Box::new(ConsoleReport::new(ui, stdout.lock())),
        OutputFormat::Json => Box::new(JsonReport::new(stdout.lock())),
    };
    let summary = BatchRunner::bql()
        .run(batch, store, channel, &cancel, sink.as_mut())
        .await;
    interrupt.abort();
    summary
}
