//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cross-platform unit test runner
#[derive(Parser, Debug)]
#[command(name = "crossunit")]
#[command(version)]
#[command(about = "Run unit tests across platforms and aggregate the results")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the registered tests
    Run(RunArgs),

    /// List registered tests
    List(ListArgs),

    /// View stored runs
    Results(ResultsArgs),

    /// Show environment variables
    Env,
}

/// Test selection shared by `run` and `list`
#[derive(clap::Args, Debug, Default)]
pub struct FilterArgs {
    /// Only tests whose full name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Only tests in these categories (comma-separated)
    #[arg(short, long)]
    pub include: Option<String>,

    /// Skip tests in these categories (comma-separated)
    #[arg(short, long)]
    pub exclude: Option<String>,
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: FilterArgs,

    /// Target platforms (comma-separated)
    #[arg(short, long)]
    pub platforms: Option<String>,

    /// Timeout in milliseconds for tests without their own
    #[arg(short, long)]
    pub timeout_ms: Option<u64>,

    /// Number of concurrent test workers
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// Console reporter (console, teamcity)
    #[arg(short, long)]
    pub reporter: Option<String>,

    /// Do not store the run
    #[arg(long)]
    pub no_save: bool,

    /// Also export the run to this file (.json or .csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub selection: FilterArgs,

    /// Show unique names, categories and timeouts
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for results command
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    /// Run ID to show; defaults to the latest run
    #[arg(short, long)]
    pub run: Option<String>,

    /// List stored runs
    #[arg(short, long)]
    pub list: bool,

    /// Show failing results only
    #[arg(long)]
    pub failures: bool,

    /// Export to file
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Export format (json, csv); taken from the file extension when omitted
    #[arg(short, long)]
    pub format: Option<String>,
}
