//! Lunar CLI - diagnostics for Lunar framework bundles
//!
//! Writes and verifies check files, validates manifests and runs the full
//! bootstrap against a mods directory without touching a running game.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use lunar_core::LunarConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = LunarConfig::load(cli.config.as_deref())?;
    init_tracing(cli.verbose, cli.quiet, config.log_level.as_deref());

    match cli.command {
        Commands::Version(args) => commands::version::run(args),
        Commands::Checkfile(cmd) => commands::checkfile::run(cmd),
        Commands::Manifest(cmd) => commands::manifest::run(cmd),
        Commands::Scan(args) => commands::scan::run(args, &config),
    }
}

/// Initialize tracing; `RUST_LOG` wins over flags and config
fn init_tracing(verbose: u8, quiet: bool, configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if quiet {
            "error"
        } else {
            match verbose {
                0 => configured.unwrap_or("warn"),
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        };
        EnvFilter::new(level)
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
