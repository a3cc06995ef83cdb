//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DefectDojo end-to-end and smoke test harness
#[derive(Parser, Debug)]
#[command(name = "dojo-probe")]
#[command(version = "0.1.0")]
#[command(about = "Run e2e and smoke checks against a DefectDojo deployment")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run test projects
    Run(RunArgs),

    /// List registered test cases
    List(ListArgs),

    /// Show recognised environment variables and the resolved configuration
    Env,

    /// Write a runner configuration file with the effective defaults
    Init {
        /// Destination (.yaml, .yml or .json)
        #[arg(default_value = "dojo-probe.yaml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Project to run (e2e, smoke); repeatable, defaults to all
    #[arg(short, long)]
    pub project: Vec<String>,

    /// Only run tests whose title matches this pattern
    #[arg(short, long)]
    pub grep: Option<String>,

    /// Focus the run on matching tests (rejected under CI)
    #[arg(long)]
    pub only: Option<String>,

    /// Number of concurrent workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Retries for a failed test
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Runner configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Root directory for reports and artifacts
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Directory holding scan fixtures
    #[arg(long)]
    pub fixtures_dir: Option<PathBuf>,

    /// WebDriver endpoint for browser tests
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Console output format (list, json, summary)
    #[arg(short, long, default_value = "list")]
    pub format: String,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Restrict to a project
    #[arg(short, long)]
    pub project: Vec<String>,

    /// Show requirements and driver per test
    #[arg(short, long)]
    pub detailed: bool,
}
