//! canon-compose - command-line batch runner
//!
//! Reads a JSON batch of raw items, composes canonical items with the
//! configured rules and writes them as a JSON array.

use anyhow::{Context, Result};
use canon_common::config::{load_config, resolve_config_path, ComposeConfig};
use canon_compose::batch::{run_batch, BatchInput};
use canon_compose::{logging, Pipeline};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::util::SubscriberInitExt;

/// Command-line arguments for canon-compose
#[derive(Parser, Debug)]
#[command(name = "canon-compose")]
#[command(about = "Compose canonical items from raw item batches")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "CANON_CONFIG")]
    config: Option<PathBuf>,

    /// Raw item batch (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file for canonical items (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing first so config loading can log
    let (subscriber, log_level) = logging::subscriber(std::io::stderr);
    subscriber.init();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = match &config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ComposeConfig::default(),
    };
    log_level
        .apply(&config.logging.level)
        .context("Failed to apply configured log level")?;

    info!("Starting canon-compose {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) if path.exists() => info!("Config: {}", path.display()),
        _ => info!("Config: built-in defaults"),
    }

    let registry = Arc::new(
        config
            .build_registry()
            .context("Failed to build schema registry")?,
    );
    let pipeline = Pipeline::from_config(&config, registry).context("Failed to build pipeline")?;

    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let input = BatchInput::from_json(&content).context("Failed to parse batch input")?;

    let canonicals = run_batch(&pipeline, &input).context("Composition failed")?;
    let json = serde_json::to_string_pretty(&canonicals)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} canonical items to {}", canonicals.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
