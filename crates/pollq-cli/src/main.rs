//! pollq - polling queue service
//!
//! - `serve`: HTTP enqueue endpoint + primary/recovery workers
//! - `worker`: workers only
//! - `demo`: in-memory run, no Redis or PostgreSQL needed

mod email;
mod http;
mod logging;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pollq_core::domain::{PollingStatus, PollingTask};
use pollq_core::impls::{InMemoryAuditSink, InMemoryStore, PgAuditSink, RedisStore};
use pollq_core::ports::QueueStore;
use pollq_core::{Pipeline, PipelineBuilder};
use tracing::info;

use crate::email::SimulatedEmailProcessor;
use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "pollq", version, about = "Polling queue with a recovery stage")]
struct Cli {
    /// Config file (defaults to ./pollq.toml when present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve POST /enqueue and run both workers
    Serve,
    /// Run both workers without the HTTP endpoint
    Worker,
    /// Enqueue a passing and a failing task against in-memory backends
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    logging::init_logging(&settings.log).context("failed to initialize logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), command = ?cli.command, "starting pollq");

    match cli.command {
        Command::Serve => serve(&settings).await,
        Command::Worker => worker(&settings).await,
        Command::Demo => demo(&settings).await,
    }
}

async fn connect_pipeline(settings: &Settings) -> anyhow::Result<Pipeline> {
    let store = RedisStore::connect(
        &settings.redis_url,
        Duration::from_secs(settings.redis_pop_timeout_secs),
    )
    .await
    .context("failed to connect to redis")?;

    let audit = PgAuditSink::connect(&settings.database_url, settings.db_max_connections)
        .await
        .context("failed to connect to postgres")?;
    audit
        .ensure_schema()
        .await
        .context("failed to prepare audit table")?;

    let pipeline = PipelineBuilder::new()
        .store(Arc::new(store))
        .audit(Arc::new(audit))
        .processor(Arc::new(SimulatedEmailProcessor::default()))
        .config(settings.queue_config())
        .build()?;
    Ok(pipeline)
}

async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let pipeline = connect_pipeline(settings).await?;
    let group = pipeline.spawn_workers();

    let app = http::router(http::AppState {
        enqueuer: pipeline.enqueuer.clone(),
    });
    let listener = tokio::net::TcpListener::bind(&settings.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.listen_addr))?;
    info!(listen_addr = %settings.listen_addr, workers = group.len(), "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // workers stop even when the server failed
    group.shutdown_and_join().await;
    served.context("server terminated unexpectedly")?;

    info!("shutdown complete");
    Ok(())
}

async fn worker(settings: &Settings) -> anyhow::Result<()> {
    let pipeline = connect_pipeline(settings).await?;
    let group = pipeline.spawn_workers();
    info!(workers = group.len(), "workers running");

    shutdown_signal().await;
    group.shutdown_and_join().await;

    info!("shutdown complete");
    Ok(())
}

async fn demo(settings: &Settings) -> anyhow::Result<()> {
    let store = Arc::new(InMemoryStore::new());
    let audit = Arc::new(InMemoryAuditSink::new());
    let config = settings.queue_config();

    let pipeline = PipelineBuilder::new()
        .store(store.clone())
        .audit(audit.clone())
        .processor(Arc::new(SimulatedEmailProcessor::new(Duration::from_millis(10))))
        .config(config.clone())
        .build()?;

    for task in [
        PollingTask::new("1", "txn_1"),
        PollingTask::new("42", "fail_task"),
    ] {
        pipeline.enqueuer.enqueue(&task).await?;
        info!(task_id = task.id(), transaction_id = task.transaction_id(), "demo task enqueued");
    }

    let group = pipeline.spawn_workers();

    // one primary row + one recovery row
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while audit.rows().await.len() < 2 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    group.shutdown_and_join().await;

    for row in audit.rows().await {
        let stage = match row.polling_status {
            PollingStatus::PrimaryProcessing => "primary",
            PollingStatus::RecoveryProcessing => "recovery",
        };
        println!(
            "audit: task_id={} transaction_id={} stage={}",
            row.task_id, row.transaction_id, stage
        );
    }
    println!(
        "queues: primary={} recovery={} retry_count:42={:?}",
        store.len(&config.primary_queue).await?,
        store.len(&config.recovery_queue).await?,
        store.get("retry_count:42").await?,
    );
    Ok(())
}

/// SIGINT or SIGTERM
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let sigint = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigint => info!("SIGINT received, shutting down"),
                _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for SIGINT only");
            let _ = sigint.await;
            info!("SIGINT received, shutting down");
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommand_with_global_config() {
        let cli = Cli::try_parse_from(["pollq", "worker", "--config", "custom.toml"]).unwrap();
        assert!(matches!(cli.command, Command::Worker));
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }
}
