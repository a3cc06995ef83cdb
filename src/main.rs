//! dojo-probe - DefectDojo end-to-end and smoke test harness
//!
//! Exercises a running DefectDojo deployment through its REST API and,
//! for the UI flows, through a WebDriver-controlled browser.
//!
//! ## Features
//!
//! - Two projects: `e2e` (API endpoints, login, products, findings) and
//!   `smoke` (authentication, health, scan import)
//! - Credential-gated cases are skipped, never failed, when secrets are absent
//! - Parallel workers, retries with flaky detection, CI policy via `CI`
//! - HTML and JSON reports, screenshots and step traces per attempt
//!
//! ## Usage
//!
//! ```bash
//! # Run everything against a local instance
//! dojo-probe run
//!
//! # Smoke project only, health checks only
//! dojo-probe run --project smoke --grep "Health Checks"
//!
//! # List registered cases
//! dojo-probe list --detailed
//!
//! # Show recognised environment variables
//! dojo-probe env
//! ```

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use regex::Regex;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

mod browser;
mod cli;
mod config;
mod executor;
mod fixtures;
mod http;
mod models;
mod output;
mod results;
mod suites;
mod utils;

use cli::Args;
use config::{RunnerConfig, TestEnv};
use executor::{select_cases, ParallelExecutor, TestRunner};
use models::{RunSummary, Suite, TestCase};
use output::{OutputFormat, ResultFormatter};
use results::ReportGenerator;
use utils::logger::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });

    let env = TestEnv::load();
    debug!("Resolved environment: {:?}", env);

    match args.command {
        cli::Command::Run(run_args) => {
            let success = run_tests(run_args, Arc::new(env)).await?;
            if !success {
                std::process::exit(1);
            }
        }
        cli::Command::List(list_args) => {
            list_tests(list_args, &env)?;
        }
        cli::Command::Env => {
            config::env::print_env_help();
            println!();
            println!("Resolved:");
            println!("{}", env.summary());
        }
        cli::Command::Init { path, force } => {
            write_config(&path, force, &env)?;
            println!("Wrote runner configuration to {}", path.display());
        }
    }

    Ok(())
}

/// Build the effective runner configuration: file or defaults, then the
/// environment policy, then command-line overrides
fn build_config(args: &cli::RunArgs, env: &TestEnv) -> Result<RunnerConfig> {
    let mut config = match &args.config {
        Some(path) => RunnerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RunnerConfig::default(),
    }
    .apply_env(env);

    if let Some(dir) = &args.output_dir {
        config = config.with_output_dir(dir);
    }
    if let Some(dir) = &args.fixtures_dir {
        config.fixtures_dir = dir.clone();
    }
    if let Some(workers) = args.workers {
        config.workers = Some(workers);
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if let Some(url) = &args.webdriver_url {
        config.webdriver_url = url.clone();
    }
    if args.headed {
        config.browser.headless = false;
    }

    Ok(config)
}

/// Resolve project names; none means every configured project
fn resolve_projects(config: &RunnerConfig, names: &[String]) -> Result<Vec<Suite>> {
    if names.is_empty() {
        return Ok(config.projects.iter().map(|p| p.suite).collect());
    }

    let mut suites = Vec::new();
    for name in names {
        let suite = config.project(name)?.suite;
        if !suites.contains(&suite) {
            suites.push(suite);
        }
    }
    Ok(suites)
}

async fn run_tests(args: cli::RunArgs, env: Arc<TestEnv>) -> Result<bool> {
    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", args.format))?;

    let config = build_config(&args, &env)?;
    config.validate(args.only.is_some())?;

    let projects = resolve_projects(&config, &args.project)?;

    let mut filters = Vec::new();
    for pattern in [&args.grep, &args.only].into_iter().flatten() {
        filters.push(Regex::new(pattern).with_context(|| format!("Invalid pattern: {pattern}"))?);
    }
    let filter_refs: Vec<&Regex> = filters.iter().collect();
    let cases = select_cases(&projects, &filter_refs);
    if cases.is_empty() {
        bail!("No tests matched the selection");
    }

    info!(
        "Running {} tests against {} ({} retries)",
        cases.len(),
        env.base_url(),
        config.retries
    );

    let html_dir = config.html_dir.clone();
    let json_file = config.json_file.clone();
    let runner = Arc::new(TestRunner::new(env.clone(), Arc::new(config))?);
    let executor = ParallelExecutor::new(runner);

    let started_at = Utc::now();
    let results = executor.run(cases).await;
    let summary = RunSummary::new(projects, env.base_url(), started_at, results);

    if let Err(e) = ReportGenerator::new(html_dir, json_file).write_all(&summary) {
        error!("Failed to write reports: {:#}", e);
    }

    let mut formatter = ResultFormatter::new(format);
    if !use_color(&env, std::io::stdout().is_terminal()) {
        formatter = formatter.no_color();
    }
    println!("{}", formatter.format_summary(&summary));

    Ok(summary.is_success())
}

/// ANSI colour only on an interactive terminal outside CI
fn use_color(env: &TestEnv, is_terminal: bool) -> bool {
    is_terminal && !env.is_ci()
}

/// Save the configuration a plain `run` would use
fn write_config(path: &Path, force: bool, env: &TestEnv) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    RunnerConfig::for_env(env).save(path)
}

fn list_tests(args: cli::ListArgs, env: &TestEnv) -> Result<()> {
    let config = RunnerConfig::for_env(env);
    let projects = resolve_projects(&config, &args.project)?;
    let cases: Vec<TestCase> = select_cases(&projects, &[]);

    println!("\nDefectDojo Test Cases ({} total)\n", cases.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut current_group = "";

    for test_case in cases {
        let group = test_case.group();
        if group != current_group {
            println!("\n{} > {}:", test_case.suite(), group);
            println!("──────────────────────────────────────────────────────────────────────");
            current_group = group;
        }

        if args.detailed {
            let requirements: Vec<&str> =
                test_case.requirements().iter().map(|r| r.name()).collect();
            let unmet = env
                .unmet(test_case.requirements())
                .map(|reason| format!(" (skipped: {reason})"))
                .unwrap_or_default();
            println!(
                "  {:65} [{}] requires: {}{}",
                test_case.name(),
                test_case.driver().name(),
                if requirements.is_empty() {
                    "-".to_string()
                } else {
                    requirements.join(", ")
                },
                unmet
            );
        } else {
            println!("  {}", test_case.name());
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    Ok(())
}
