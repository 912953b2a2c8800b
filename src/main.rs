//! Conformance harness CLI
//!
//! Resolves a tree of test manifests and runs each selected page through a
//! page runner program, one at a time, with per-page timeouts.

use std::path::PathBuf;

use clap::Parser;
use harness::common::logging;
use harness::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "harness", about = "Manifest-driven conformance suite runner")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    if let Err(e) = cli::dispatch(cli.command, cli.config.as_deref()).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
