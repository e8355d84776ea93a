pub mod config;
pub mod scan;

use crate::errors::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "apiscan",
    version,
    about = "Extract API endpoint definitions from Python, Java and Node.js sources"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory or Git repository for API endpoints
    Scan(scan::ScanArgs),
    /// Inspect the resolved configuration
    Config(config::ConfigArgs),
}

impl Cli {
    /// Whether debug logging was requested on the command line.
    pub fn verbose(&self) -> bool {
        matches!(&self.command, Commands::Scan(args) if args.verbose)
    }
}

/// Dispatch to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scan(args) => scan::run(&args),
        Commands::Config(args) => config::run(&args),
    }
}
