//! CLI argument definitions using clap
//!
//! Commands:
//! - crudgate check --config <path>
//! - crudgate explain --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// crudgate - query translation, ACL injection and CRUD dispatch
#[derive(Parser, Debug)]
#[command(name = "crudgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the configuration and schema, then summarize the entities
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./crudgate.json")]
        config: PathBuf,
    },

    /// Read one request from stdin and print the query it would run
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./crudgate.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
