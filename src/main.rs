//! crossunit - cross-platform unit test execution engine
//!
//! Runs registered, parameterized test cases on isolated workers under a
//! timeout, classifies each outcome and aggregates results across target
//! platforms for the console, TeamCity and AppVeyor.
//!
//! ## Usage
//!
//! ```bash
//! # Run the sample suites on two platforms
//! crossunit run --platforms linux,windows
//!
//! # Run only the math category with TeamCity markers
//! crossunit run --include math --reporter teamcity
//!
//! # List tests with their unique names
//! crossunit list --detailed
//!
//! # Show the latest stored run and export it
//! crossunit results --export latest.csv
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

mod assert;
mod cli;
mod config;
mod executor;
mod fixture;
mod models;
mod output;
mod results;
mod suites;
mod utils;

use cli::Args;
use config::{env::EnvConfig, AppConfig};
use executor::ParallelExecutor;
use fixture::TestFilter;
use models::{split_category, Platform};
use output::{AppVeyorClient, AppVeyorReporter, ReporterMode, Reporters};
use results::{ExportFormat, PlatformAggregator, ResultsStorage, StoredRun};
use utils::logger::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    init_logger(LogLevel::from_verbose(
        args.verbose || env.verbose.unwrap_or(false),
    ));

    let config_path = args
        .config
        .clone()
        .or_else(|| env.config_file.as_ref().map(PathBuf::from));
    let mut config = AppConfig::resolve(config_path.as_deref())?;
    config.apply_env(&env);

    match args.command {
        cli::Command::Run(run_args) => {
            let passed = run_tests(run_args, config, &env).await?;
            if !passed {
                std::process::exit(1);
            }
        }
        cli::Command::List(list_args) => {
            list_tests(list_args);
        }
        cli::Command::Results(results_args) => {
            show_results(results_args, &config)?;
        }
        cli::Command::Env => {
            config::env::print_env_help();
            println!();
            env.print_summary();
        }
    }

    Ok(())
}

fn build_filter(selection: &cli::FilterArgs) -> TestFilter {
    let mut filter = TestFilter::new();
    if let Some(name) = &selection.filter {
        filter = filter.name(name);
    }
    for category in selection.include.as_deref().map(split_category).unwrap_or_default() {
        filter = filter.include(category);
    }
    for category in selection.exclude.as_deref().map(split_category).unwrap_or_default() {
        filter = filter.exclude(category);
    }
    filter
}

fn storage_for(config: &AppConfig) -> ResultsStorage {
    match &config.results_dir {
        Some(dir) => ResultsStorage::new(dir),
        None => ResultsStorage::default_dir(),
    }
}

/// Run the sample suites; returns whether every result passed
async fn run_tests(args: cli::RunArgs, mut config: AppConfig, env: &EnvConfig) -> Result<bool> {
    if let Some(platforms) = &args.platforms {
        config.platforms = Platform::parse_list(platforms);
    }
    if let Some(timeout) = args.timeout_ms {
        config.default_timeout_ms = Some(timeout);
    }
    if let Some(concurrent) = args.concurrent {
        config.max_concurrent = concurrent;
    }
    if let Some(reporter) = &args.reporter {
        config.reporter = ReporterMode::from_str(reporter)
            .ok_or_else(|| anyhow::anyhow!("Unknown reporter: {reporter}"))?;
    }
    config.validate()?;

    let cases = suites::registry().filter(&build_filter(&args.selection));
    info!(
        "Running {} tests on {}",
        cases.len(),
        config
            .platforms
            .iter()
            .map(Platform::name)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut reporters = Reporters::stdout(config.reporter);
    if let Some(url) = &config.appveyor_api_url {
        let client = AppVeyorClient::new(url)?;
        reporters = reporters.with_appveyor(AppVeyorReporter::new(client));
    }

    let aggregator = PlatformAggregator::new(config.platforms.clone());
    let executor = ParallelExecutor::new(config.max_concurrent)
        .with_default_timeout(config.default_timeout());

    reporters.run_started()?;
    let stats = executor
        .run_all(&cases, &aggregator, |case| {
            if let Err(e) = reporters.case_completed(case) {
                warn!("Failed to report {}: {}", case.identity, e);
            }
        })
        .await;
    reporters.run_finished(&aggregator)?;

    let posted = reporters.flush_remote().await;
    if posted > 0 {
        info!("Posted {} results to AppVeyor", posted);
    }

    let run = StoredRun::from_aggregator(&aggregator, stats.started_at, stats.ended_at)
        .with_ci(env.ci_server().map(str::to_string));

    if !args.no_save {
        storage_for(&config).save(&run)?;
    }
    if let Some(path) = &args.output {
        let format = ExportFormat::from_extension(path).unwrap_or(ExportFormat::Json);
        storage_for(&config).export(&run, path, format)?;
    }

    Ok(run.passed())
}

fn list_tests(args: cli::ListArgs) {
    let registry = suites::registry();
    let cases = registry.filter(&build_filter(&args.selection));

    println!("\nRegistered tests ({} of {})\n", cases.len(), registry.len());

    let mut current_fixture = String::new();
    for case in &cases {
        let identity = &case.identity;
        if identity.fixture.name != current_fixture {
            println!("{}.{}:", identity.fixture.module, identity.fixture.name);
            current_fixture = identity.fixture.name.clone();
        }

        if args.detailed {
            let timeout = identity
                .timeout
                .map(|t| format!("{}ms", t.as_millis()))
                .unwrap_or_else(|| "none".to_string());
            println!("  {}", identity.display_name);
            println!("      unique:   {}", identity.unique_name);
            println!("      category: {}", identity.category.join(","));
            println!("      timeout:  {timeout}");
            if let Some(description) = &identity.description {
                println!("      about:    {description}");
            }
        } else {
            println!("  {}", identity.display_name);
        }
    }
    println!();
}

fn show_results(args: cli::ResultsArgs, config: &AppConfig) -> Result<()> {
    let storage = storage_for(config);

    if args.list {
        let runs = storage.list_runs()?;
        if runs.is_empty() {
            println!("\nNo stored results in {}", storage.base_dir().display());
            return Ok(());
        }

        println!("\n{:22} {:>9} {:>6} {:>6} {:>6}", "Run", "Platforms", "Total", "Pass", "Fail");
        for run in runs {
            println!(
                "{:22} {:>9} {:>6} {:>6} {:>6}",
                run.id, run.platforms, run.total, run.succeeded, run.failed
            );
        }
        println!();
        return Ok(());
    }

    let run = match &args.run {
        Some(id) => storage.load(id)?,
        None => storage
            .latest()?
            .context("No stored results; run `crossunit run` first")?,
    };

    println!(
        "\nRun {} ({} - {})",
        run.id,
        run.started_at.format("%Y-%m-%d %H:%M:%S"),
        run.completed_at.format("%H:%M:%S")
    );
    for result in &run.results {
        if args.failures && !result.kind.is_failure() {
            continue;
        }
        println!("  {result}");
        if args.failures && !result.output.is_empty() {
            for line in result.output.lines() {
                println!("      {line}");
            }
        }
    }
    println!();

    if let Some(path) = &args.export {
        let format = match &args.format {
            Some(name) => ExportFormat::from_str(name)
                .ok_or_else(|| anyhow::anyhow!("Unknown export format: {name}"))?,
            None => ExportFormat::from_extension(path).unwrap_or(ExportFormat::Json),
        };
        storage.export(&run, path, format)?;
    }

    Ok(())
}
