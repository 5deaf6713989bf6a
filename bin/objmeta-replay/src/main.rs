//! objmeta replay tool
//!
//! Applies a log of namespace write requests to a local metadata store,
//! the way a replica applies entries handed to it by the consensus layer.

mod replay;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use objmeta_apply::{KeyMetrics, MetaContext};
use objmeta_common::MetaConfig;
use objmeta_store::MetaStore;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "objmeta-replay")]
#[command(about = "Apply a namespace request log to a local objmeta store")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/objmeta/objmeta.toml")]
    config: String,

    /// Database path (overrides the configuration)
    #[arg(long, env = "OBJMETA_DB")]
    db: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load volumes, buckets and open keys from a JSON file
    Seed {
        /// Seed file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Apply a JSONL request log in index order
    Replay {
        /// Log file, one entry per line
        #[arg(short, long)]
        log: PathBuf,
    },
    /// Print a committed key
    GetKey {
        #[arg(long)]
        volume: String,
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        key: String,
    },
}

fn load_config(path: &str) -> Result<MetaConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix("OBJMETA")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to load configuration from {path}"))?;
    Ok(settings.try_deserialize()?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let metrics_handle = if args.metrics {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("failed to install metrics recorder")?;
        KeyMetrics::describe();
        Some(handle)
    } else {
        None
    };

    let mut config = load_config(&args.config)?;
    if let Some(db) = args.db {
        config.db_path = db;
    }
    info!("Config file: {}", args.config);
    info!("Database: {}", config.db_path.display());

    let store = Arc::new(MetaStore::open(&config.db_path)?);

    match args.command {
        Commands::Seed { file } => {
            let reader = BufReader::new(
                File::open(&file).with_context(|| format!("cannot open {}", file.display()))?,
            );
            let seed_file: replay::SeedFile = serde_json::from_reader(reader)
                .with_context(|| format!("invalid seed file {}", file.display()))?;
            let rows = replay::seed(&store, &seed_file)?;
            info!("Wrote {} rows", rows);
        }
        Commands::Replay { log } => {
            let reader = BufReader::new(
                File::open(&log).with_context(|| format!("cannot open {}", log.display()))?,
            );
            let ctx = MetaContext::new(Arc::clone(&store), config);
            let flush_batch_size = ctx.config().flush_batch_size;
            replay::replay(&ctx, reader, io::stdout().lock(), flush_batch_size)?;
        }
        Commands::GetKey {
            volume,
            bucket,
            key,
        } => {
            let row = MetaStore::ozone_key(&volume, &bucket, &key);
            let info = store
                .key_table()
                .get(&row)?
                .with_context(|| format!("key {row} not found"))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    if let Some(handle) = metrics_handle {
        eprintln!("{}", handle.render());
    }
    Ok(())
}
