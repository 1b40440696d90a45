//! testmatrix CLI - Conditional test-matrix runner
//! Composition root: settings, logging and adapter wiring

mod logging;
mod output;
mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use testmatrix_core::application::{default_matrix, load_matrix, plan_entries, Orchestrator};
use testmatrix_core::domain::{EnvironmentFacts, Matrix};
use testmatrix_core::port::{
    EnvironmentProbe, IdProvider, SystemTimeProvider, TimeProvider, UuidProvider,
};
use testmatrix_core::VERSION;
use testmatrix_infra_system::{
    current_env_report, InterpreterProbe, PipDependencyManager, PytestHarness, PythonToolchain,
};

use settings::{LogFormat, Overrides, Settings};

#[derive(Parser)]
#[command(name = "testmatrix")]
#[command(about = "Run gated test scenarios against one Python environment", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Extra settings file (toml, json or yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Python interpreter used for pip, pytest and fact probing
    #[arg(long, global = true)]
    python: Option<String>,

    /// Directory the subprocesses run in
    #[arg(long, global = true)]
    working_dir: Option<PathBuf>,

    /// Argument passed to every pytest invocation (repeatable)
    #[arg(long = "pytest-arg", global = true, allow_hyphen_values = true)]
    pytest_args: Vec<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the matrix (fail-fast)
    Run {
        /// Scenario matrix as JSON (default: built-in catalog)
        #[arg(short, long)]
        matrix: Option<PathBuf>,

        /// Write a JSON run report to this file
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Do not print the environment variable dump
        #[arg(long)]
        no_env_report: bool,
    },

    /// Show which scenarios would run, without side effects
    Plan {
        /// Scenario matrix as JSON (default: built-in catalog)
        #[arg(short, long)]
        matrix: Option<PathBuf>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the probed interpreter facts
    Facts {
        /// Print the facts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the sorted environment variable dump
    Env,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = Overrides {
        python: cli.python.clone(),
        working_dir: cli.working_dir.clone(),
        log_format: cli.log_format,
        pytest_args: cli.pytest_args.clone(),
    };
    let settings = Settings::load(cli.config.as_deref(), &overrides)?;

    logging::init(settings.log_format)?;
    info!(version = VERSION, python = %settings.python, "testmatrix starting");

    let code = match cli.command {
        Commands::Run {
            matrix,
            report,
            no_env_report,
        } => run(&settings, matrix.as_deref(), report.as_deref(), no_env_report).await?,
        Commands::Plan { matrix, json } => {
            plan(&settings, matrix.as_deref(), json).await?;
            0
        }
        Commands::Facts { json } => {
            facts(&settings, json).await?;
            0
        }
        Commands::Env => {
            print!("{}", current_env_report());
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn matrix_from(path: Option<&Path>) -> Result<Matrix> {
    match path {
        Some(path) => load_matrix(path)
            .with_context(|| format!("Failed to load matrix from {}", path.display())),
        None => Ok(default_matrix()),
    }
}

async fn probe(
    toolchain: &PythonToolchain,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<EnvironmentFacts> {
    let facts = InterpreterProbe::new(toolchain.clone(), time_provider)
        .capture()
        .await
        .context("Failed to probe interpreter facts")?;
    info!(facts = %facts, "Environment facts captured");
    Ok(facts)
}

/// Returns the process exit code
async fn run(
    settings: &Settings,
    matrix_path: Option<&Path>,
    report_path: Option<&Path>,
    no_env_report: bool,
) -> Result<i32> {
    // 1. Diagnostic dump before anything touches the environment
    if !no_env_report {
        print!("{}", current_env_report());
    }

    // 2. Wire adapters
    let toolchain = settings.toolchain();
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);
    let dependency_manager = Arc::new(PipDependencyManager::new(
        toolchain.clone(),
        time_provider.clone(),
    ));
    let test_harness = Arc::new(PytestHarness::new(
        toolchain.clone(),
        time_provider.clone(),
        settings.pytest_args.clone(),
    ));

    let matrix = matrix_from(matrix_path)?;
    let orchestrator = Orchestrator::new(
        &matrix,
        dependency_manager,
        test_harness,
        time_provider.clone(),
        id_provider,
    )
    .context("Invalid scenario matrix")?;

    // 3. Facts are read once, before the first gate
    let facts = probe(&toolchain, time_provider).await?;

    // 4. Orchestrate
    let report = orchestrator.run(&facts).await.context("Run failed")?;

    println!();
    println!("{}", output::summary(&report));

    if let Some(path) = report_path {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        info!(path = %path.display(), "Run report written");
    }

    Ok(report.result.exit_code())
}

async fn plan(settings: &Settings, matrix_path: Option<&Path>, json: bool) -> Result<()> {
    let matrix = matrix_from(matrix_path)?;
    matrix.validate().context("Invalid scenario matrix")?;

    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let facts = probe(&settings.toolchain(), time_provider).await?;
    let entries = plan_entries(&matrix.plan(), &facts);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{} {}", "Facts:".bold(), facts);
        println!("{}", output::plan_table(&entries));
    }
    Ok(())
}

async fn facts(settings: &Settings, json: bool) -> Result<()> {
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let facts = probe(&settings.toolchain(), time_provider).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&facts)?);
    } else {
        println!("{} {}", "Version:".bold(), facts.version);
        println!("{} {}", "Implementation:".bold(), facts.implementation);
        println!("{} {}", "Release level:".bold(), facts.release_level);
    }
    Ok(())
}
