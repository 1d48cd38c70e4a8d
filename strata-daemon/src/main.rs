//! Strata Execution Daemon binary
//!
//! Loads configuration from the environment (overridable by flags), builds
//! the catalog, tool registry and executor, then polls until SIGINT or
//! SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use strata_catalog::{Catalog, InMemoryCatalog};
use strata_daemon::{Config, ExecutionDaemon, ToolRegistry, executor};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "strata-daemon")]
#[command(about = "Strata job execution daemon", long_about = None)]
struct Cli {
    /// Seconds between two check cycles
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Maximum jobs handled per queue and cycle
    #[arg(long)]
    jobs_per_cycle: Option<usize>,

    /// Physical root of the default job directories
    #[arg(long)]
    job_dir: Option<PathBuf>,

    /// Per-tool concurrency ceilings, `tool=N,tool=N`
    #[arg(long)]
    tool_limits: Option<String>,

    /// JSON snapshot backing the catalog
    #[arg(long)]
    catalog_snapshot: Option<PathBuf>,

    /// Process-launch backend
    #[arg(long)]
    executor: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strata_daemon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Strata execution daemon");

    let cli = Cli::parse();
    let config = load_config(cli)?;
    info!(
        "Loaded configuration: job_dir={}, executor={}, tool limits={:?}",
        config.job_dir.display(),
        config.executor,
        config.tool_limits
    );

    let catalog: Arc<dyn Catalog> = match &config.catalog_snapshot {
        Some(snapshot) => Arc::new(
            InMemoryCatalog::open(snapshot)
                .with_context(|| format!("Failed to open catalog {}", snapshot.display()))?,
        ),
        None => Arc::new(InMemoryCatalog::new()),
    };

    let tools = Arc::new(ToolRegistry::builtin());
    info!("Registered {} tools", tools.len());

    let executor = executor::from_name(&config.executor)?;

    let daemon = ExecutionDaemon::new(config, catalog, executor, tools);
    install_shutdown_handler(daemon.shutdown_token())?;

    if let Err(e) = daemon.run().await {
        error!("Execution daemon error: {:#}", e);
        return Err(e);
    }

    Ok(())
}

/// Loads configuration from the environment and applies flag overrides
fn load_config(cli: Cli) -> Result<Config> {
    let mut config = Config::from_env()?;

    if let Some(secs) = cli.poll_interval {
        config.poll_interval = Duration::from_secs(secs);
    }
    if let Some(jobs) = cli.jobs_per_cycle {
        config.jobs_per_cycle = jobs;
    }
    if let Some(job_dir) = cli.job_dir {
        config.job_dir = job_dir;
    }
    if let Some(limits) = cli.tool_limits {
        config.tool_limits = strata_daemon::config::parse_tool_limits(&limits)?;
    }
    if let Some(snapshot) = cli.catalog_snapshot {
        config.catalog_snapshot = Some(snapshot);
    }
    if let Some(executor) = cli.executor {
        config.executor = executor;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Cancels `token` on SIGTERM or SIGINT
fn install_shutdown_handler(token: CancellationToken) -> Result<()> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down"),
        }
        token.cancel();
    });

    Ok(())
}
