#![forbid(unsafe_code)]

//! `crm-ingest-ctl`: local CLI companion for `crm-ingest`.
//!
//! Runs batch imports and inspects jobs directly against the configured
//! database, without going through the HTTP server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crm_ingest::config::GlobalConfig;
use crm_ingest::import::parse::{parse_table, preview};
use crm_ingest::import::template::{default_mapping, template_csv};
use crm_ingest::import::{ColumnMapping, ImportPipeline};
use crm_ingest::persistence::db;
use crm_ingest::policy::DuplicateStrategy;
use crm_ingest::{AppError, Result};

#[derive(Debug, Parser)]
#[command(
    name = "crm-ingest-ctl",
    about = "Local CLI for crm-ingest imports",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file. Required for commands that
    /// touch the database.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stage and execute a client import file.
    Import {
        /// CSV or spreadsheet file.
        file: PathBuf,
        /// TOML file with `[[mapping]]` entries; the template mapping is
        /// used when omitted.
        #[arg(long)]
        mapping: Option<PathBuf>,
        /// Duplicate handling: skip, update, or create-new.
        #[arg(long, default_value = "skip", value_parser = parse_strategy)]
        strategy: DuplicateStrategy,
    },

    /// Show the columns and first rows of a file.
    Preview {
        /// CSV or spreadsheet file.
        file: PathBuf,
        /// Number of sample rows.
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },

    /// Write the import template.
    Template {
        /// Destination file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show the status of an import job.
    Job {
        /// Import job ID.
        id: String,
    },
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    mapping: Vec<ColumnMapping>,
}

fn parse_strategy(raw: &str) -> std::result::Result<DuplicateStrategy, String> {
    DuplicateStrategy::parse(raw).ok_or_else(|| format!("unknown strategy {raw:?}"))
}

fn main() {
    let args = Cli::parse();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();

    let outcome = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(args)));

    if let Err(err) = outcome {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Cli) -> Result<()> {
    match args.command {
        Command::Template { out } => {
            let csv = template_csv()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, csv)?;
                    println!("template written to {}", path.display());
                }
                None => print!("{csv}"),
            }
            Ok(())
        }
        Command::Preview { file, rows } => {
            let table = parse_table(&file_name(&file), &std::fs::read(&file)?)?;
            print_json(&preview(&table, rows))
        }
        Command::Import {
            file,
            mapping,
            strategy,
        } => {
            let pipeline = open_pipeline(args.config.as_deref()).await?;
            let mapping = match mapping {
                Some(path) => load_mapping(&path)?,
                None => default_mapping(),
            };
            let (job, _) = pipeline
                .stage(&file_name(&file), &std::fs::read(&file)?)
                .await?;
            let job = pipeline.execute(&job.id, &mapping, strategy).await?;
            print_json(&job.status_view())
        }
        Command::Job { id } => {
            let pipeline = open_pipeline(args.config.as_deref()).await?;
            print_json(&pipeline.status(&id).await?.status_view())
        }
    }
}

async fn open_pipeline(config_path: Option<&Path>) -> Result<ImportPipeline> {
    let path = config_path
        .ok_or_else(|| AppError::Config("--config is required for this command".into()))?;
    let mut config = GlobalConfig::load_from_path(path)?;
    config.apply_env_overrides();
    let db = Arc::new(db::connect(&config.database).await?);
    Ok(ImportPipeline::new(&db, config.import))
}

fn load_mapping(path: &Path) -> Result<Vec<ColumnMapping>> {
    let raw = std::fs::read_to_string(path)?;
    let file: MappingFile = toml::from_str(&raw)
        .map_err(|err| AppError::Validation(format!("invalid mapping file: {err}")))?;
    Ok(file.mapping)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(format!("cannot render output: {err}")))?;
    println!("{text}");
    Ok(())
}
