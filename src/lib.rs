//! Vigil: a local-first activity monitoring agent.
//!
//! Vigil observes local activity sources, normalizes what it sees into typed
//! Event Records, and persists them in a queryable SQLite store. Everything
//! stays on the machine.
//!
//! # Architecture
//!
//! - **Collectors** observe one source each (filesystem notifications,
//!   system samples, application focus) and push records into the store.
//!   They are resolved from configuration through a static registry.
//! - **Collection Manager** owns the collector set and drives best-effort
//!   aggregate start/stop.
//! - **Storage Engine** owns the persisted schema: three event tables keyed
//!   by observation timestamp, plus derived features and model artifacts.
//!   Writes are serialized internally; reads run concurrently under WAL.
//! - **Controller** wires storage to the manager for one process lifetime.
//!
//! # Examples
//!
//! ```bash
//! # Write vigil.toml and create the store
//! vigil init
//!
//! # Collect until ctrl-c
//! vigil run
//!
//! # Query what was recorded
//! vigil events --kind file --since 1754000000
//! vigil features --feature-type usage --limit 20
//! vigil model get --name ranker
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: shared primitives and the storage plane
//! - [`collectors`]: producer implementations and their registry

pub mod collectors;
pub mod core;

use crate::core::config::{self, Config};
use crate::core::controller::Controller;
use crate::core::error::VigilError;
use crate::core::event::EventKind;
use crate::core::storage::StorageEngine;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(
    name = "vigil",
    version = env!("CARGO_PKG_VERSION"),
    about = "Local-first activity monitoring: collect filesystem, application, and system events into a queryable store"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config file and initialize the store
    Init(InitCli),

    /// Run the collection pipeline until interrupted
    Run(RunCli),

    /// Query stored events as JSON
    Events(EventsCli),

    /// Query stored feature records as JSON
    Features(FeaturesCli),

    /// Look up stored model artifacts
    Model(ModelCli),

    /// Show the schema of every registered collector
    Schema(SchemaCli),
}

#[derive(clap::Args, Debug)]
struct InitCli {
    /// Directory for the config file (defaults to the current directory).
    #[clap(short, long)]
    dir: Option<PathBuf>,
    /// Overwrite an existing config file.
    #[clap(long)]
    force: bool,
}

#[derive(clap::Args, Debug)]
struct RunCli {
    /// Config file path.
    #[clap(long, default_value = "vigil.toml")]
    config: PathBuf,
}

#[derive(clap::Args, Debug)]
struct EventsCli {
    /// Event kind: file, application, or system.
    #[clap(long)]
    kind: String,
    /// Inclusive lower timestamp bound (seconds since epoch).
    #[clap(long)]
    since: Option<f64>,
    /// Inclusive upper timestamp bound (seconds since epoch).
    #[clap(long)]
    until: Option<f64>,
    /// Config file path.
    #[clap(long, default_value = "vigil.toml")]
    config: PathBuf,
}

#[derive(clap::Args, Debug)]
struct FeaturesCli {
    /// Restrict to one feature type.
    #[clap(long)]
    feature_type: Option<String>,
    /// Maximum rows returned, most recent first.
    #[clap(long, default_value = "100")]
    limit: usize,
    /// Config file path.
    #[clap(long, default_value = "vigil.toml")]
    config: PathBuf,
}

#[derive(clap::Args, Debug)]
struct ModelCli {
    #[clap(subcommand)]
    command: ModelCommand,
}

#[derive(Subcommand, Debug)]
enum ModelCommand {
    /// Show a stored model's metadata (latest version unless pinned)
    Get {
        #[clap(long)]
        name: String,
        #[clap(long)]
        version: Option<String>,
        #[clap(long, default_value = "vigil.toml")]
        config: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct SchemaCli {
    /// Optional: filter by collector name.
    #[clap(long)]
    collector: Option<String>,
}

pub fn run() -> Result<(), VigilError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init(init_cli) => run_init(init_cli),
        Command::Run(run_cli) => run_pipeline(&run_cli.config),
        Command::Events(events_cli) => {
            let storage = open_storage(&events_cli.config)?;
            let kind = EventKind::from_name(&events_cli.kind).ok_or_else(|| {
                VigilError::NotFound(format!("event kind '{}'", events_cli.kind))
            })?;
            let records = storage.get_events(kind, events_cli.since, events_cli.until)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }
        Command::Features(features_cli) => {
            let storage = open_storage(&features_cli.config)?;
            let records =
                storage.get_features(features_cli.feature_type.as_deref(), features_cli.limit)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }
        Command::Model(model_cli) => match model_cli.command {
            ModelCommand::Get {
                name,
                version,
                config,
            } => {
                let storage = open_storage(&config)?;
                let artifact = storage
                    .get_model(&name, version.as_deref())?
                    .ok_or_else(|| {
                        VigilError::NotFound(format!(
                            "model '{}'{}",
                            name,
                            version
                                .as_deref()
                                .map(|v| format!(" version '{}'", v))
                                .unwrap_or_default()
                        ))
                    })?;
                let summary = serde_json::json!({
                    "name": artifact.name,
                    "version": artifact.version,
                    "created_at": artifact.created_at,
                    "model_type": artifact.model_type,
                    "serialized_bytes": artifact.serialized_blob.len(),
                    "performance_metrics": artifact.metrics,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
                Ok(())
            }
        },
        Command::Schema(schema_cli) => {
            let output = match schema_cli.collector {
                Some(name) => collectors::resolve(&name)
                    .map(|spec| (spec.schema)())
                    .ok_or(VigilError::ResolutionError(name))?,
                None => {
                    let mut schemas = serde_json::Map::new();
                    for spec in collectors::REGISTRY {
                        schemas.insert(spec.name.to_string(), (spec.schema)());
                    }
                    serde_json::Value::Object(schemas)
                }
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

fn run_init(init_cli: InitCli) -> Result<(), VigilError> {
    let target_dir = match init_cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let config_path = target_dir.join("vigil.toml");

    if config_path.exists() && !init_cli.force {
        println!(
            "{} {} already exists; use {} to overwrite",
            "⚠".bright_yellow(),
            config_path.display(),
            "--force".bright_cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, config::DEFAULT_CONFIG)?;
    println!(
        "  {} {}",
        "●".bright_green(),
        config_path.display().to_string().bright_white()
    );

    let config = Config::load(&config_path)?;
    let db_path = config.resolved_db_path();
    StorageEngine::open(&db_path)?;
    println!(
        "  {} {}",
        "●".bright_green(),
        db_path.display().to_string().bright_white()
    );
    println!();
    println!("Edit {} and start with: vigil run", config_path.display());
    Ok(())
}

fn run_pipeline(config_path: &PathBuf) -> Result<(), VigilError> {
    let config = Config::load(config_path)?;
    let mut controller = Controller::initialize(&config)?;

    if !controller.start() {
        log::error!("some collectors failed to start; continuing with the rest");
    }
    println!(
        "vigil running with {} collector(s); press ctrl-c to stop",
        controller.collector_count()
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        log::warn!("failed to set ctrl-c handler: {}", e);
    }

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    if controller.stop() {
        println!("vigil stopped");
    } else {
        println!("vigil stopped with collector errors; see the log");
    }
    Ok(())
}

fn open_storage(config_path: &PathBuf) -> Result<StorageEngine, VigilError> {
    let config = Config::load(config_path)?;
    StorageEngine::open(&config.resolved_db_path())
}
