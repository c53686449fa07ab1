//! Statement batch runner.
//!
//! A [`Batch`] is an ordered list of statements read from one script. The
//! [`BatchRunner`] drives each statement through a [`Pipeline`] of three
//! adapters (compile, plan, execute) against one shared store, in order, and
//! hands every outcome to a [`ReportSink`]. A failing statement is reported
//! with the stage that failed and never stops the rest of the batch.
//!
//! Only two things fail a run as a whole, both before the first statement:
//! an unreadable script ([`BatchError::Source`]) and a store that cannot be
//! prepared ([`BatchError::Store`]).
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use triq::batch::{Batch, BatchRunner, ChannelSize, PlainReport};
//! use triq::storage::{MemoryStore, StoreHandle};
//!
//! # async fn demo() -> triq::batch::Result<()> {
//! let batch = Batch::load("script.bql")?;
//! let store: StoreHandle = Arc::new(MemoryStore::new("default"));
//! let mut sink = PlainReport::new(std::io::stdout());
//! let summary = BatchRunner::bql()
//!     .run(&batch, &store, ChannelSize(0), &CancellationToken::new(), &mut sink)
//!     .await;
//! println!("{} failed", summary.failed);
//! # Ok(())
//! # }
//! ```

/// Compiler, planner and executor seams.
pub mod adapters;
mod error;
mod outcome;
mod pipeline;
mod report;
mod runner;
mod script;

pub use error::{BatchError, ChannelSizeError, Result};
pub use outcome::{
    ExecutionOutcome, RunStatus, RunSummary, Stage, StatementFailure, StatementReport,
    StatementStatus,
};
pub use pipeline::Pipeline;
pub use report::{JsonReport, Marker, PlainReport, ReportSink};
pub use runner::BatchRunner;
pub use script::{Batch, ChannelSize, ScriptStatement};
