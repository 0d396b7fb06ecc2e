//! threadbridge entry point.
//!
//! Platform transport, the AI CLI binary, and the install step behind
//! auto-update are external collaborators (see `platform`, `ai`,
//! `update::Installer`) — this binary only wires up the core services and
//! keeps the background schedulers running. A deployment embeds this crate
//! alongside a concrete `Platform` adapter and drives the actual inbound
//! message / reaction loop against it; that loop lives with the embedder,
//! not here.

use anyhow::Context as _;
use clap::Parser;
use std::sync::Arc;
use threadbridge::cleanup::CleanupScheduler;
use threadbridge::clock::SystemClock;
use threadbridge::config::Config;
use threadbridge::process::TokioSpawner;
use threadbridge::session::{SessionLifecycle, SessionRegistry};
use threadbridge::sticky::StickyMessage;
use threadbridge::store::SessionStore;
use threadbridge::update::{Installer, UpdateCoordinator};
use threadbridge::worktree::{SystemGit, WorktreeManager};

#[derive(Parser)]
#[command(name = "threadbridge", version, about = "Bridges a chat platform to a long-lived AI CLI session per thread")]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

/// No-op installer: the actual install command is supplied by whatever
/// packages this crate for a specific deployment.
struct UnconfiguredInstaller;

#[async_trait::async_trait]
impl Installer for UnconfiguredInstaller {
    async fn install(&self, target_version: &semver::Version) -> threadbridge::Result<()> {
        tracing::warn!(%target_version, "update available but no installer is configured, skipping");
        Ok(())
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("threadbridge={default_level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build Tokio runtime")?;

    runtime.block_on(run())
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    tracing::info!(data_dir = %config.data_dir.display(), "configuration loaded");
    let config = Arc::new(config);

    let store = Arc::new(SessionStore::new(config.session_store_path()));
    let registry = Arc::new(SessionRegistry::new());
    let clock = Arc::new(SystemClock);
    let spawner = Arc::new(TokioSpawner);
    let _lifecycle = Arc::new(SessionLifecycle::new(
        registry.clone(),
        store.clone(),
        spawner,
        config.clone(),
        clock,
    ));

    let worktrees = Arc::new(WorktreeManager::new(Arc::new(SystemGit), config.worktree_root()));
    let cleanup = Arc::new(CleanupScheduler::new(
        config.cleanup.clone(),
        config.logs_dir(),
        config.worktree_root(),
        worktrees,
        registry.clone(),
    ));
    let _cleanup_handle = cleanup.spawn();
    tracing::info!("cleanup scheduler started");

    let _sticky = StickyMessage::new(registry.clone(), store.clone());

    let current_version: semver::Version = env!("CARGO_PKG_VERSION")
        .parse()
        .context("crate version is not valid semver")?;
    let coordinator = Arc::new(UpdateCoordinator::new(
        current_version,
        config.update.mode,
        config.update.registry_url.clone(),
        config.update_state_path(),
        config.update.restart_exit_code,
        registry.clone(),
    ));

    if let Some(state) = coordinator.check_post_update().await {
        tracing::info!(
            previous = ?state.previous_version,
            current = ?state.target_version,
            "came back from a self-initiated update"
        );
    }

    let update_handle = tokio::spawn({
        let coordinator = coordinator.clone();
        let check_interval = config.update.check_interval;
        async move {
            let installer = UnconfiguredInstaller;
            let mut ticker = tokio::time::interval(check_interval);
            loop {
                ticker.tick().await;
                match coordinator.tick(chrono::Utc::now()).await {
                    Ok(threadbridge::update::UpdateAction::None) => {}
                    Ok(threadbridge::update::UpdateAction::AskUser { target_version }) => {
                        tracing::info!(%target_version, "update available, awaiting user confirmation");
                    }
                    Ok(threadbridge::update::UpdateAction::InstallAndRestart { target_version }) => {
                        match coordinator.perform_restart(&installer, target_version).await {
                            Ok(exit_code) => std::process::exit(exit_code),
                            Err(error) => tracing::error!(%error, "update install failed"),
                        }
                    }
                    Err(error) => tracing::error!(%error, "update check failed"),
                }
            }
        }
    });

    tracing::info!("threadbridge core services running, awaiting shutdown signal");
    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received");
    update_handle.abort();

    Ok(())
}
