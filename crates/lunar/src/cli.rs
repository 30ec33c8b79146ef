//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Lunar - shared component loader diagnostics
#[derive(Parser, Debug)]
#[command(name = "lunar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to lunar.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Write or verify `.lfc` check files
    #[command(subcommand)]
    Checkfile(CheckfileCommands),

    /// Inspect framework manifests
    #[command(subcommand)]
    Manifest(ManifestCommands),

    /// Discover, validate and dry-run load every framework copy in a mods directory
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum CheckfileCommands {
    /// Write a check file next to each payload
    Write(CheckfileArgs),

    /// Verify each payload against its check file
    Verify(CheckfileArgs),
}

#[derive(Args, Debug)]
pub struct CheckfileArgs {
    /// Framework version the check files are keyed to
    #[arg(long = "version", value_name = "VERSION")]
    pub framework_version: String,

    /// Payload files
    #[arg(required = true)]
    pub files: Vec<Utf8PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ManifestCommands {
    /// Parse a manifest and list its components
    Validate(ManifestValidateArgs),
}

#[derive(Args, Debug)]
pub struct ManifestValidateArgs {
    /// Path to Manifest.xml
    pub path: Utf8PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Mods directory (defaults to `mods_dir` from config)
    #[arg(long)]
    pub mods_dir: Option<Utf8PathBuf>,

    /// Host version used for `MinGameVersion` checks
    #[arg(long)]
    pub host_version: Option<String>,

    /// Leave legacy assemblies in place
    #[arg(long)]
    pub no_cleanup: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
