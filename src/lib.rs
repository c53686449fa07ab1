//! Triq runs scripts of triple pattern statements against a shared store.
//!
//! - [`batch`] drives statements one by one and reports their outcomes.
//! - [`query`] is the bundled statement engine (parser, planner, executor).
//! - [`storage`] defines the store seam and an in-memory implementation.

#![warn(missing_docs)]

pub mod batch;
pub mod logging;
pub mod query;
pub mod storage;
pub mod types;
