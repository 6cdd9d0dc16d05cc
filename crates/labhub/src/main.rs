//! LabHub catalog indexer
//!
//! Scans the mounted UNETLAB mirror trees and writes the JSON catalogs the
//! LabHub installer downloads images from.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "labhub", version, about = "Build the LabHub image catalogs")]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Configuration file (default: ./labhub.toml if present)
    #[arg(short = 'c', long, global = true, env = "LABHUB_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the sources and write every catalog variant
    Index(cli::index::IndexArgs),

    /// Report duplicate names and checksums in a merged catalog
    Check(cli::check::CheckArgs),

    /// Re-sort and re-number existing catalog files in place
    Renumber(cli::renumber::RenumberArgs),

    /// Show the resolved configuration
    Config(cli::config::ConfigArgs),
}

fn run_command(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Index(args) => cli::index::run(args, config),
        Commands::Check(args) => cli::check::run(args),
        Commands::Renumber(args) => cli::renumber::run(args),
        Commands::Config(args) => cli::config::run(args, config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = labhub_logging::init_logging(labhub_logging::LogConfig {
        app_name: "labhub",
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}
