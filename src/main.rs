//! Building Management Scheduler — process entry point.
//!
//! Wires the per-site runtime together: config → registry → stores →
//! queue → Gate → control-algorithm registry, spawns one ticker per
//! equipment unit plus the worker pool and the stall-recovery sweep, and
//! supervises them with a `CancellationToken` + `JoinSet` shutdown idiom.

use anyhow::{Context, Result};
use bms_scheduler::config;
use bms_scheduler::gate::Gate;
use bms_scheduler::logic::ControlAlgorithmRegistry;
use bms_scheduler::queue::{InMemoryJobQueue, JobQueue, RedisJobQueue};
use bms_scheduler::registry::EquipmentRegistry;
use bms_scheduler::runtime::{run_stall_sweep, run_ticker, SiteRuntime, StateStore};
use bms_scheduler::stores::{HttpMetricsStore, HttpUiCommandStore, InMemoryMetricsStore, InMemoryUiCommandStore};
use bms_scheduler::worker::run_worker_pool;
use bms_scheduler::writer::{HttpCommandWriter, InMemoryCommandWriter};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "bms-scheduler")]
#[command(about = "Smart Queue Scheduler for building management HVAC equipment")]
#[command(version)]
struct CliArgs {
    /// Path to the site's TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the site id from the config file.
    #[arg(long)]
    site: Option<u32>,

    /// Wipe the local sled-backed UnitState store on startup.
    #[arg(long)]
    reset_state: bool,

    /// Run the Gate and log decisions without ever enqueueing a job.
    #[arg(long)]
    dry_run: bool,
}

/// Task identification for supervisor logging.
#[derive(Debug, Clone, Copy)]
enum TaskName {
    Ticker,
    WorkerPool,
    StallSweep,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::Ticker => write!(f, "Ticker"),
            TaskName::WorkerPool => write!(f, "WorkerPool"),
            TaskName::StallSweep => write!(f, "StallSweep"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    config::init_with_site_override(args.config.as_deref(), args.site)
        .context("failed to load site config")?;

    let config = config::get();
    let dry_run = args.dry_run || config.dry_run;

    info!(site_id = config.site_id, site_name = %config.site_name, dry_run, "starting bms-scheduler");

    if args.reset_state {
        warn!("--reset-state: wiping local unit-state store before startup");
        let store = StateStore::open(&config.state_db_path).context("failed to open state store for reset")?;
        store.reset().context("failed to reset state store")?;
    }

    let registry = Arc::new(
        EquipmentRegistry::new(config.equipment_units.clone()).context("invalid equipment registry")?,
    );
    if registry.is_empty() {
        warn!("equipment registry is empty, this process will idle forever");
    }

    let (metrics_store, ui_command_store, command_writer): (
        Arc<dyn bms_scheduler::stores::MetricsStore>,
        Arc<dyn bms_scheduler::stores::UiCommandStore>,
        Arc<dyn bms_scheduler::writer::CommandWriter>,
    ) = if dry_run {
        (
            Arc::new(InMemoryMetricsStore::new()),
            Arc::new(InMemoryUiCommandStore::new()),
            Arc::new(InMemoryCommandWriter::new()),
        )
    } else {
        (
            Arc::new(HttpMetricsStore::new(config.metrics_store_url.as_str())),
            Arc::new(HttpUiCommandStore::new(config.ui_command_store_url.as_str())),
            Arc::new(HttpCommandWriter::new(config.command_writer_url.as_str())),
        )
    };

    let queue: Arc<dyn JobQueue> = if dry_run {
        Arc::new(InMemoryJobQueue::new())
    } else {
        Arc::new(
            RedisJobQueue::connect(&config.redis_url, config.site_id)
                .await
                .context("failed to connect to the queue backend")?,
        )
    };

    let state_store = Arc::new(StateStore::open(&config.state_db_path).context("failed to open state store")?);
    let algorithms = Arc::new(ControlAlgorithmRegistry::with_defaults());
    let gate = Arc::new(Gate::new(
        Arc::clone(&registry),
        Arc::clone(&metrics_store),
        Arc::clone(&ui_command_store),
    ));

    let runtime = Arc::new(SiteRuntime::new(
        config.site_id,
        Arc::clone(&registry),
        Arc::clone(&gate),
        Arc::clone(&queue),
        Arc::clone(&metrics_store),
        Arc::clone(&command_writer),
        Arc::clone(&state_store),
        Arc::clone(&algorithms),
    ));

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    #[cfg(unix)]
    {
        let shutdown_token = cancel_token.clone();
        tokio::spawn(async move {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    info!("received SIGTERM, initiating shutdown...");
                    shutdown_token.cancel();
                }
                Err(err) => warn!(error = %err, "failed to install SIGTERM handler"),
            }
        });
    }

    let mut task_set: JoinSet<TaskName> = JoinSet::new();

    for unit in registry.enumerate() {
        let runtime = Arc::clone(&runtime);
        let unit = unit.clone();
        let shutdown = cancel_token.clone();
        task_set.spawn(async move {
            run_ticker(runtime, unit, shutdown, dry_run).await;
            TaskName::Ticker
        });
    }

    if !dry_run {
        let runtime = Arc::clone(&runtime);
        let shutdown = cancel_token.clone();
        let concurrency = config.worker_concurrency;
        task_set.spawn(async move {
            run_worker_pool(runtime, "bms-worker", concurrency, shutdown).await;
            TaskName::WorkerPool
        });

        let runtime = Arc::clone(&runtime);
        let shutdown = cancel_token.clone();
        let sweep_interval = Duration::from_secs(config.stall_sweep_interval_secs);
        task_set.spawn(async move {
            run_stall_sweep(runtime, sweep_interval, shutdown).await;
            TaskName::StallSweep
        });
    }

    info!("all tasks spawned, supervising until shutdown");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("shutdown signal received, waiting for tasks to finish");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(task_name)) => {
                        info!(task = %task_name, "task exited before shutdown");
                    }
                    Some(Err(err)) => {
                        error!(error = %err, "task panicked");
                        cancel_token.cancel();
                    }
                    None => {
                        info!("all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    cancel_token.cancel();
    while task_set.join_next().await.is_some() {}

    info!("bms-scheduler shutdown complete");
    Ok(())
}
