use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info};

use employee_pipeline::config::{BackendKind, Config, UnparsedBirthdatePolicy};
use employee_pipeline::logging;
use employee_pipeline::pipeline::{prepare_from, Pipeline};
use employee_pipeline::storage::{Backend, InMemoryBackend, SqliteBackend};

#[derive(Parser)]
#[command(name = "employee_pipeline")]
#[command(about = "Load employee records from CSV into a database and report on them")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML configuration file; missing file means defaults
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read, transform, sort, load and query
    Run(RunArgs),
    /// Read, transform, sort and load; no queries
    Load(RunArgs),
    /// Run the reports against an already loaded table
    Query(RunArgs),
    /// Read, transform and sort, printing the records; no database
    Preview {
        /// Source CSV file
        #[arg(long)]
        source: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Source CSV file
    #[arg(long)]
    source: Option<PathBuf>,
    /// Database file
    #[arg(long)]
    database: Option<PathBuf>,
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,
    /// What to store for a birthdate that could not be parsed
    #[arg(long, value_enum)]
    unparsed_birthdate: Option<UnparsedBirthdatePolicy>,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(source) = &self.source {
            config.source.path = source.clone();
        }
        if let Some(database) = &self.database {
            config.database.path = database.clone();
        }
        if let Some(backend) = self.backend {
            config.database.backend = backend;
        }
        if let Some(policy) = self.unparsed_birthdate {
            config.load.unparsed_birthdate = policy;
        }
    }
}

#[derive(Clone, Copy)]
enum Stages {
    All,
    LoadOnly,
    QueryOnly,
}

fn execute<B: Backend>(config: &Config, backend: &B, stages: Stages, out: &mut dyn Write) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config, backend);
    match stages {
        Stages::All => {
            let report = pipeline.run(out).context("pipeline run failed")?;
            info!(
                rows_loaded = report.rows_loaded,
                unparsed_birthdates = report.diagnostics.len(),
                "Run complete"
            );
        }
        Stages::LoadOnly => {
            let prepared = pipeline
                .prepare(out)
                .context("failed while reading and transforming the source")?;
            pipeline
                .load(&prepared.records, out)
                .context("failed during load stage")?;
        }
        Stages::QueryOnly => {
            pipeline.query(out).context("failed during query stage")?;
        }
    }
    Ok(())
}

/// The memory backend starts empty every process, so there is never a table to query.
fn check_backend(stages: Stages, backend: BackendKind) -> anyhow::Result<()> {
    if matches!((stages, backend), (Stages::QueryOnly, BackendKind::Memory)) {
        anyhow::bail!(
            "the memory backend keeps nothing between runs; use `run --backend memory` or query a sqlite database"
        );
    }
    Ok(())
}

fn run_with_backend(config: &Config, stages: Stages, out: &mut dyn Write) -> anyhow::Result<()> {
    check_backend(stages, config.database.backend)?;
    match config.database.backend {
        BackendKind::Sqlite => {
            let backend = SqliteBackend::new(&config.database.path);
            info!(target_db = %backend.describe(), "Using database");
            execute(config, &backend, stages, out)
        }
        BackendKind::Memory => {
            let backend = InMemoryBackend::new();
            info!(target_db = %backend.describe(), "Using database");
            execute(config, &backend, stages, out)
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let (stages, args) = match &cli.command {
        Commands::Run(args) => (Stages::All, args),
        Commands::Load(args) => (Stages::LoadOnly, args),
        Commands::Query(args) => (Stages::QueryOnly, args),
        Commands::Preview { source } => {
            if let Some(source) = source {
                config.source.path = source.clone();
            }
            let _guard = logging::init_logging(&config.logging);
            prepare_from(&config.source.path, &mut out)
                .context("failed while reading and transforming the source")?;
            return Ok(());
        }
    };
    args.apply(&mut config);

    let _guard = logging::init_logging(&config.logging);
    info!(source = %config.source.path.display(), "Starting employee pipeline");

    if let Err(e) = run_with_backend(&config, stages, &mut out) {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
