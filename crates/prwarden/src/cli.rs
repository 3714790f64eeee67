//! Exposes the command line application.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::logging;
use crate::server;

/// prwarden commands.
#[derive(Subcommand)]
enum Command {
    /// Run the web server.
    Run,
}

/// Command line interface parser.
#[derive(Parser)]
#[command(bin_name = "prwarden", version)]
struct Cli {
    /// Path to your configuration file.
    #[arg(long, short = 'c', global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Returns the path to the configuration file.
    fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

/// Runs the main application.
pub fn execute() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::get(cli.config()).context("failed loading config")?;

    logging::init_logging(&config);

    match cli.command {
        Command::Run => server::run(config).context("failed to start the server")?,
    }

    Ok(())
}
