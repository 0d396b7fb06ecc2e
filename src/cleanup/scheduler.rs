//! Cleanup scheduler: a periodic scan that purges stale thread logs and
//! orphaned worktrees, built on `interval_at` + `MissedTickBehavior::Skip`
//! plus an `ExecutionGuard` RAII flag that clears on drop so a slow scan
//! never overlaps itself. Collapsed to a single recurring job rather than a
//! job registry since there is exactly one scan to run.

use crate::config::CleanupConfig;
use crate::session::SessionRegistry;
use crate::worktree::{WorktreeManager, WorktreeMetadata};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

const METADATA_FILE: &str = ".threadbridge-worktree.json";

/// RAII guard that clears the "scan in progress" flag on drop, so a panic
/// mid-scan can't wedge the scheduler into permanently skipping ticks.
struct ExecutionGuard(Arc<AtomicBool>);

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One removal decision made during a worktree sweep, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReason {
    NoSidecar,
    BranchMerged,
    InactiveFor(u64),
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub logs_deleted: usize,
    pub worktrees_removed: Vec<(PathBuf, RemovalReason)>,
    pub errors: Vec<String>,
}

pub struct CleanupScheduler {
    config: CleanupConfig,
    logs_dir: PathBuf,
    worktree_root: PathBuf,
    worktrees: Arc<WorktreeManager>,
    sessions: Arc<SessionRegistry>,
    running: Arc<AtomicBool>,
}

impl CleanupScheduler {
    pub fn new(
        config: CleanupConfig,
        logs_dir: PathBuf,
        worktree_root: PathBuf,
        worktrees: Arc<WorktreeManager>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            config,
            logs_dir,
            worktree_root,
            worktrees,
            sessions,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the recurring scan task. The returned handle can be aborted to
    /// stop the scheduler.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let first_tick = tokio::time::Instant::now() + self.config.interval;
            let mut ticker = tokio::time::interval_at(first_tick, self.config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if self.running.swap(true, Ordering::Acquire) {
                    tracing::debug!("cleanup scan already running, skipping tick");
                    continue;
                }
                let _guard = ExecutionGuard(self.running.clone());
                let report = self.scan().await;
                for error in &report.errors {
                    tracing::error!(%error, "cleanup scan error");
                }
                tracing::info!(
                    logs_deleted = report.logs_deleted,
                    worktrees_removed = report.worktrees_removed.len(),
                    "cleanup scan complete"
                );
            }
        })
    }

    /// Run one scan pass. Errors are collected rather than propagated, since
    /// a cleanup failure must never block normal operation (§4.8).
    pub async fn scan(&self) -> ScanReport {
        let mut errors = Vec::new();

        let logs_deleted = if self.config.log_retention_enabled {
            match self.clean_logs().await {
                Ok(n) => n,
                Err(e) => {
                    errors.push(e.to_string());
                    0
                }
            }
        } else {
            0
        };

        let worktrees_removed = match self.sweep_worktrees().await {
            Ok((removed, mut sweep_errors)) => {
                errors.append(&mut sweep_errors);
                removed
            }
            Err(e) => {
                errors.push(e.to_string());
                Vec::new()
            }
        };

        ScanReport { logs_deleted, worktrees_removed, errors }
    }

    async fn clean_logs(&self) -> crate::Result<usize> {
        let mut removed = 0;
        let mut entries = match tokio::fs::read_dir(&self.logs_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let cutoff = std::time::SystemTime::now() - self.config.log_retention;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            let modified = metadata.modified().unwrap_or(std::time::SystemTime::now());
            if modified < cutoff {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn sweep_worktrees(&self) -> crate::Result<(Vec<(PathBuf, RemovalReason)>, Vec<String>)> {
        let mut removed = Vec::new();
        let mut errors = Vec::new();

        let active_paths = self.sessions.active_worktree_paths();

        let mut entries = match tokio::fs::read_dir(&self.worktree_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((removed, errors)),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_dir() || active_paths.contains(&path) {
                continue;
            }

            let decision = self.decide(&path).await;
            if let Some(reason) = decision {
                match self.remove_one(&path, &reason).await {
                    Ok(()) => removed.push((path, reason)),
                    Err(e) => errors.push(format!("{}: {e}", path.display())),
                }
            }
        }

        Ok((removed, errors))
    }

    async fn decide(&self, worktree_path: &Path) -> Option<RemovalReason> {
        let sidecar_path = worktree_path.join(METADATA_FILE);
        let metadata = match tokio::fs::read(&sidecar_path).await {
            Ok(bytes) => serde_json::from_slice::<WorktreeMetadata>(&bytes).ok(),
            Err(_) => None,
        };

        let Some(metadata) = metadata else {
            return Some(RemovalReason::NoSidecar);
        };

        let age = (chrono::Utc::now() - metadata.created_at).to_std().unwrap_or_default();
        if age < self.config.worktree_max_age {
            return None;
        }

        match self.worktrees.is_branch_merged(&metadata.repo_root, &metadata.branch).await {
            Ok(true) => Some(RemovalReason::BranchMerged),
            _ => Some(RemovalReason::InactiveFor(age.as_secs() / 3600)),
        }
    }

    async fn remove_one(&self, worktree_path: &Path, reason: &RemovalReason) -> crate::Result<()> {
        tracing::info!(path = %worktree_path.display(), ?reason, "removing orphaned worktree");
        let sidecar = worktree_path.join(METADATA_FILE);
        let repo_root = match tokio::fs::read(&sidecar).await {
            Ok(bytes) => serde_json::from_slice::<WorktreeMetadata>(&bytes).ok().map(|m| m.repo_root),
            Err(_) => None,
        };

        if let Some(repo_root) = repo_root {
            if self.worktrees.remove(&repo_root, worktree_path).await.is_err() {
                tokio::fs::remove_dir_all(worktree_path).await?;
            }
        } else {
            tokio::fs::remove_dir_all(worktree_path).await?;
        }

        let _ = tokio::fs::remove_file(&sidecar).await;
        Ok(())
    }
}
