//! CLI module for NanoPivot
//!
//! Provides command-line interface for:
//! - load: Load the sample data and print statistics
//! - query: One-shot aggregation query
//! - members: Level members of a hierarchy
//! - export / inspect: Snapshot images

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{export, inspect, load, members, query, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_response;
