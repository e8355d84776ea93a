#![allow(dead_code)]

mod cli;
mod config;
mod errors;
mod filter;
mod git;
mod output;
mod parse;
mod walk;

use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // RUST_LOG wins; --verbose only changes the fallback
    let fallback = if cli.verbose() { "apiscan=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::dispatch(cli).map_err(|e| miette::miette!("{e}"))?;
    Ok(())
}
