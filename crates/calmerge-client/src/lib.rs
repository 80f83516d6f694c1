//! CLI and run orchestration
//!
//! This crate provides the `calmerge` command-line interface.

pub mod cli;
pub mod error;
pub mod run;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use run::{RunSummary, run, write_calendar};
