//! Silver Fox command line.
//!
//! Every command opens the configured database, syncs the dealership
//! entries from the config file into it, and prints its result as JSON on
//! stdout. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use silverfox::config::load_config_from_str;
use silverfox::db::{dealership_repo, order_repo};
use silverfox::schedule::ScheduledTask;
use silverfox::{
    load_config, Clock, Config, Database, ImportManager, LogProgress, OrderProcessor, Scheduler,
    SystemClock, VehicleType,
};

#[derive(Parser)]
#[command(name = "silverfox", version)]
#[command(about = "Dealership inventory imports and CAO/LIST order processing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to silverfox.json; built-in defaults are used if it does not exist
    #[arg(long, global = true, env = "SILVERFOX_CONFIG", default_value = "silverfox.json")]
    config: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Import scraper JSON files as one new active batch
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Label stored with the batch
        #[arg(long)]
        source: Option<String>,
    },
    /// Import and archive everything in the configured import directory
    ImportDir,
    /// Run a Comparative Analysis Order for one dealership
    Cao {
        dealership: String,
        /// Vehicle types overriding the configured filter, e.g. used,po
        #[arg(long, value_delimiter = ',')]
        types: Vec<VehicleType>,
        /// Do not record VINs in history
        #[arg(long, default_value_t = false)]
        test: bool,
    },
    /// Run an order for an explicit VIN list
    List {
        dealership: String,
        vins: Vec<String>,
        /// File with additional VINs, separated by whitespace or commas
        #[arg(long)]
        file: Option<PathBuf>,
        /// Do not record VINs in history
        #[arg(long, default_value_t = false)]
        test: bool,
    },
    /// Run CAO for every active dealership
    DailyCao,
    /// Show recent orders for a dealership
    Orders {
        dealership: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Run the daily import and CAO jobs until interrupted
    Schedule,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) -> Result<()> {
    tracing_log::LogTracer::init().context("Failed to install log bridge")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (text, json) = match format {
        LogFormat::Text => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

fn load(path: &Path) -> Result<Config> {
    if path.exists() {
        return load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }
    log::warn!("{} not found, using default configuration", path.display());
    Ok(load_config_from_str(r#"{ "version": "1.0" }"#)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_vin_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read VIN file {}", path.display()))?;
    Ok(content
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let config = load(&cli.config)?;
    let db_path = config.database_path();
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    dealership_repo::sync_from_config(&db, &config.dealerships)
        .context("Failed to sync dealership configs")?;

    let processor = || {
        OrderProcessor::from_config(db.clone(), &config).with_progress(Arc::new(LogProgress))
    };

    match cli.command {
        Commands::Import { files, source } => {
            let importer = ImportManager::from_config(db.clone(), &config);
            let summary = importer.import_files(&files, source.as_deref())?;
            print_json(&summary)?;
        }
        Commands::ImportDir => {
            let importer = ImportManager::from_config(db.clone(), &config);
            match importer.import_directory()? {
                Some(summary) => print_json(&summary)?,
                None => print_json(&serde_json::Value::Null)?,
            }
        }
        Commands::Cao {
            dealership,
            types,
            test,
        } => {
            let types = (!types.is_empty()).then_some(types.as_slice());
            let result = processor().process_cao_order(&dealership, types, test);
            print_json(&result)?;
            return Ok(exit_code(result.success));
        }
        Commands::List {
            dealership,
            mut vins,
            file,
            test,
        } => {
            if let Some(path) = file {
                vins.extend(read_vin_file(&path)?);
            }
            if vins.is_empty() {
                bail!("No VINs given; pass them as arguments or with --file");
            }
            let result = processor().process_list_order(&dealership, &vins, test);
            print_json(&result)?;
            return Ok(exit_code(result.success));
        }
        Commands::DailyCao => {
            let results = processor().process_daily_cao_orders();
            print_json(&results)?;
            return Ok(exit_code(results.iter().all(|r| r.success)));
        }
        Commands::Orders { dealership, limit } => {
            let orders = order_repo::list_by_dealership(&db, &dealership, limit)?;
            print_json(&orders)?;
        }
        Commands::Schedule => {
            let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
            ctrlc::set_handler(move || {
                let _ = shutdown_tx.try_send(());
            })
            .context("Failed to install Ctrl-C handler")?;

            let clock = SystemClock;
            let mut scheduler = Scheduler::from_config(&config.schedule, clock.now())?;
            let importer = ImportManager::from_config(db.clone(), &config);
            let processor = processor();

            scheduler.run(&clock, &shutdown_rx, |job| match job.task {
                ScheduledTask::DailyImport => {
                    importer.run_daily_import();
                }
                ScheduledTask::DailyCaoOrders => {
                    let results = processor.process_daily_cao_orders();
                    let failed = results.iter().filter(|r| !r.success).count();
                    if failed > 0 {
                        log::warn!("{} of {} CAO orders failed", failed, results.len());
                    }
                }
            });
        }
    }

    Ok(ExitCode::SUCCESS)
}
