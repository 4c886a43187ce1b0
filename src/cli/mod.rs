//! CLI module for crudgate
//!
//! Provides command-line interface for:
//! - check: Load config and schema, summarize entities
//! - explain: Print the secured query a request would run

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, explain, run, run_command};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_json, write_response};
