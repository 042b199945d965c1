use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::cli::{CommonArgs, CommonCommands, utils};
use janitor::lock::LocalLockProvider;
use janitor::retention::RetentionManager;
use janitor::service::run_scheduler;
use janitor::stores::RetentionStores;
use janitor::stores::memory::{InMemoryDocumentStore, InMemoryKnowledgeStore, InMemoryRuleStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "graphvault")]
#[command(about = "GraphVault janitor - retention management for the knowledge platform")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<JanitorCommands>,
}

#[derive(Subcommand)]
enum JanitorCommands {
    #[command(flatten)]
    Common(CommonCommands),
}

impl Default for JanitorCommands {
    fn default() -> Self {
        Self::Common(CommonCommands::Start)
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM)
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = sigint.recv() => log::info!("Received SIGINT"),
            _ = sigterm.recv() => log::info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        log::info!("Received Ctrl+C");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on CLI arguments
    utils::init_logging(&cli.common);

    // Load application configuration
    let config = utils::load_config(cli.common.config.as_ref())?;

    // Handle common commands that don't require starting the service
    let command = cli.command.unwrap_or_default();
    let JanitorCommands::Common(ref common_cmd) = command;
    if utils::handle_common_command(common_cmd, &config).await? {
        return Ok(()); // Command handled, exit early
    }

    if !config.retention.enabled {
        log::info!("Retention manager is disabled in configuration (retention.enabled = false)");
        log::info!(
            "Set GRAPHVAULT__RETENTION__ENABLED=true or enable in config file to run the janitor"
        );
        return Ok(());
    }

    config
        .retention
        .validate()
        .context("Invalid retention settings")?;

    // The standalone binary only carries the in-memory backends. Production
    // deployments embed the janitor as a library and wire RetentionStores to
    // their real query engine, file storage and rule database.
    if config.storage.backend != "memory" {
        anyhow::bail!(
            "Unknown storage backend '{}' (the standalone janitor supports only 'memory')",
            config.storage.backend
        );
    }

    log::info!("Starting GraphVault janitor (standalone mode, in-memory stores)");

    let stores = RetentionStores {
        rules: Arc::new(InMemoryRuleStore::new()),
        knowledge: Arc::new(InMemoryKnowledgeStore::new()),
        documents: Arc::new(InMemoryDocumentStore::new()),
    };

    let manager = Arc::new(
        RetentionManager::new(stores, config.retention.clone())
            .context("Failed to initialize retention manager")?,
    );

    let shutdown = CancellationToken::new();
    let locks = Arc::new(LocalLockProvider::new(shutdown.clone()));

    let scheduler = tokio::spawn(run_scheduler(manager, locks, shutdown.clone()));

    log::info!("Janitor running, waiting for shutdown signal");
    wait_for_shutdown_signal().await?;

    log::info!("Received shutdown signal, stopping janitor");
    shutdown.cancel();
    scheduler
        .await
        .context("Retention scheduler task panicked")?;

    log::info!("Janitor stopped");

    Ok(())
}
