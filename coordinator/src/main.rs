//! Code Generation Dispatch Coordinator
//!
//! This binary runs the standalone coordinator that watches a queue
//! directory for candidate configurations from a tuning session,
//! fans generation work out across a pool of worker slots, and
//! publishes completion notices back to the session.
//!
//! # Usage
//!
//! ```bash
//! # Start the coordinator on a queue directory
//! cg-coordinator /scratch/codegen/queue
//!
//! # Start with a configuration file
//! cg-coordinator --config coordinator.toml /scratch/codegen/queue
//! ```

mod dispatch;
mod publish;
mod queue;
mod session;
mod worker;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codegen_core::{CoordinatorConfig, CoordinatorError};
use dispatch::DispatchLoop;

/// Code Generation Dispatch Coordinator
#[derive(Parser, Debug)]
#[command(name = "cg-coordinator")]
#[command(about = "Dispatch coordinator for tuning-driven code generation")]
struct Args {
    /// Queue directory to watch for session and candidate files
    queue_dir: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Queue poll interval in milliseconds (overrides config)
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => CoordinatorConfig::from_file(path)?,
        None => CoordinatorConfig::default(),
    };
    config = config.with_env_overrides();
    if let Some(interval) = args.poll_interval {
        config.dispatch.poll_interval_ms = interval;
    }
    config.validate()?;

    if !args.queue_dir.is_dir() {
        return Err(Box::new(CoordinatorError::io(
            &args.queue_dir,
            "queue directory does not exist",
        )) as Box<dyn std::error::Error>);
    }

    tracing::info!("Starting code generation coordinator");
    tracing::info!("  Queue directory: {}", args.queue_dir.display());
    tracing::info!("  Poll interval: {}ms", config.dispatch.poll_interval_ms);
    tracing::info!("  Reap interval: {}ms", config.dispatch.reap_interval_ms);
    tracing::info!("  Setup script: {}", config.dispatch.setup_script);

    // Clear stale candidates from a previous run before accepting new
    // ones. The initialization file survives the sweep.
    let removed = queue::sweep_candidates(&args.queue_dir).await?;
    if removed > 0 {
        tracing::info!("Removed {} stale candidate file(s)", removed);
    }

    let mut coordinator = DispatchLoop::new(&args.queue_dir, config);

    tokio::select! {
        result = coordinator.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down coordinator...");
        }
    }

    Ok(())
}
