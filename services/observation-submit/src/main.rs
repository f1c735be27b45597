//! Observation submitter.
//!
//! Reads a YAML manifest of nodes and posts them to the Totality
//! observations service in batches.

mod manifest;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use manifest::Manifest;
use totality_client::{ClientConfig, FlushOutcome, RecordingTransport, Totality};

#[derive(Parser, Debug)]
#[command(name = "observation-submit")]
#[command(about = "Submit node observations from a YAML manifest")]
struct Args {
    /// Manifest of nodes to submit
    manifest: PathBuf,

    /// Client configuration file (default: TOTALITY_* environment)
    #[arg(long, env = "TOTALITY_CONFIG")]
    config: Option<PathBuf>,

    /// API key, overrides the configured one
    #[arg(long, env = "TOTALITY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Records per request, overrides the configured threshold
    #[arg(long)]
    batch_size: Option<usize>,

    /// Build and print the documents without sending them
    #[arg(long)]
    dry_run: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;
    let manifest = Manifest::load(&args.manifest)?;
    let metadata = manifest.batch_metadata().context("Invalid batch metadata")?;
    let nodes = manifest.build_nodes()?;

    info!(
        manifest = %args.manifest.display(),
        nodes = nodes.len(),
        threshold = config.flush.threshold,
        dry_run = args.dry_run,
        "Submitting observations"
    );

    let recorder = Arc::new(RecordingTransport::new());
    let client = if args.dry_run {
        Totality::with_transport(config, recorder.clone())?
    } else {
        Totality::new(config)?
    };

    let mut batch = client.create_nodes_collection(metadata);
    let mut outcomes = Vec::new();
    let mut scope = batch.scope();
    for node in nodes {
        if let Some(outcome) = scope.add(node).await? {
            outcomes.push(outcome);
        }
    }
    outcomes.push(scope.close().await?);

    let mut delivered = 0;
    let mut rejected = 0;
    for outcome in &outcomes {
        match outcome {
            FlushOutcome::Delivered { count } => delivered += count,
            FlushOutcome::Rejected { count, .. } => rejected += count,
            FlushOutcome::Empty => {}
        }
    }

    if args.dry_run {
        for request in recorder.requests() {
            println!("POST {}", request.url);
            println!("{}", serde_json::to_string_pretty(&request.body)?);
        }
    }

    if rejected > 0 {
        warn!(delivered, rejected, "Some observations were rejected");
    } else {
        info!(delivered, "Submission complete");
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_yaml_file(path)?,
        None => ClientConfig::from_env()?,
    };

    if let Some(key) = &args.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(size) = args.batch_size {
        config.flush.threshold = size;
    }
    config.validate()?;

    if config.api_key.is_none() && !args.dry_run {
        warn!("No API key configured; the service will likely reject requests");
    }
    Ok(config)
}
