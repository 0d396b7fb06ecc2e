//! Worktree lifecycle manager (§4.7): ties validation, the git runner, and
//! sidecar metadata together.

use super::git::GitRunner;
use super::validate::{is_valid_branch_name, is_valid_worktree_path};
use crate::error::{Result, WorktreeError};
use crate::SessionId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Sidecar metadata written alongside each worktree directory, so a
/// restarted process can re-derive ownership without asking git.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorktreeMetadata {
    pub session_id: String,
    pub repo_root: PathBuf,
    pub branch: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

const METADATA_FILE: &str = ".threadbridge-worktree.json";

pub struct WorktreeManager {
    git: Arc<dyn GitRunner>,
    worktree_root: PathBuf,
}

impl WorktreeManager {
    pub fn new(git: Arc<dyn GitRunner>, worktree_root: PathBuf) -> Self {
        Self { git, worktree_root }
    }

    /// Derive the central worktree directory name:
    /// `<encoded-repo>--<sanitized-branch>-<uuid8>`.
    fn worktree_path_for(&self, repo_root: &Path, branch: &str) -> PathBuf {
        let encoded_repo = encode_repo_name(repo_root);
        let sanitized_branch: String = branch
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        let suffix = &Uuid::new_v4().simple().to_string()[..8];
        self.worktree_root
            .join(format!("{encoded_repo}--{sanitized_branch}-{suffix}"))
    }

    pub async fn create(&self, session_id: &SessionId, repo_root: &Path, branch: &str) -> Result<crate::WorktreeInfo> {
        if !is_valid_branch_name(branch) {
            return Err(WorktreeError::InvalidBranchName(branch.to_string()).into());
        }
        let worktree_path = self.worktree_path_for(repo_root, branch);
        if !is_valid_worktree_path(&worktree_path, &self.worktree_root) {
            return Err(WorktreeError::InvalidBranchName(branch.to_string()).into());
        }

        let create_branch = !self.git.branch_exists(repo_root, branch).await?;
        self.git
            .worktree_add(repo_root, &worktree_path, branch, create_branch)
            .await?;

        let metadata = WorktreeMetadata {
            session_id: session_id.0.clone(),
            repo_root: repo_root.to_path_buf(),
            branch: branch.to_string(),
            created_at: chrono::Utc::now(),
        };
        write_metadata(&worktree_path, &metadata).await?;

        Ok(crate::WorktreeInfo {
            repo_root: repo_root.to_path_buf(),
            worktree_path,
            branch: branch.to_string(),
        })
    }

    /// Remove a worktree: clean remove, then force, then prune as a last
    /// resort so a stale entry never blocks recreation (§4.7).
    pub async fn remove(&self, repo_root: &Path, worktree_path: &Path) -> Result<()> {
        if !is_valid_worktree_path(worktree_path, &self.worktree_root) {
            return Err(WorktreeError::Shared(worktree_path.display().to_string()).into());
        }
        if self.git.worktree_remove(repo_root, worktree_path, false).await.is_ok() {
            return Ok(());
        }
        if self.git.worktree_remove(repo_root, worktree_path, true).await.is_ok() {
            return Ok(());
        }
        self.git.worktree_prune(repo_root).await
    }

    /// Refuse cleanup of a worktree with uncommitted changes or an unmerged
    /// branch, surfacing the reason rather than silently skipping it (§9).
    pub async fn cleanup_eligible(&self, repo_root: &Path, branch: &str) -> Result<std::result::Result<(), String>> {
        if self.git.has_uncommitted_changes(repo_root).await? {
            return Ok(Err("worktree has uncommitted changes".to_string()));
        }
        if !self.git.is_branch_merged(repo_root, branch).await? {
            return Ok(Err("branch is not merged into the default branch".to_string()));
        }
        Ok(Ok(()))
    }

    pub async fn list(&self, repo_root: &Path) -> Result<Vec<super::git::WorktreeEntry>> {
        self.git.worktree_list(repo_root).await
    }

    pub async fn is_branch_merged(&self, repo_root: &Path, branch: &str) -> Result<bool> {
        self.git.is_branch_merged(repo_root, branch).await
    }
}

fn encode_repo_name(repo_root: &Path) -> String {
    repo_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repo".to_string())
}

async fn write_metadata(worktree_path: &Path, metadata: &WorktreeMetadata) -> Result<()> {
    let json = serde_json::to_string_pretty(metadata).map_err(|e| WorktreeError::GitCommand(e.to_string()))?;
    tokio::fs::write(worktree_path.join(METADATA_FILE), json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct FakeGit {
        merged: AtomicBool,
        dirty: AtomicBool,
        added: Mutex<Vec<PathBuf>>,
    }

    #[async_trait::async_trait]
    impl GitRunner for FakeGit {
        async fn worktree_list(&self, _repo_root: &Path) -> Result<Vec<super::super::git::WorktreeEntry>> {
            Ok(vec![])
        }
        async fn worktree_add(&self, _repo_root: &Path, worktree_path: &Path, _branch: &str, _create_branch: bool) -> Result<()> {
            self.added.lock().unwrap().push(worktree_path.to_path_buf());
            Ok(())
        }
        async fn worktree_remove(&self, _repo_root: &Path, _worktree_path: &Path, _force: bool) -> Result<()> {
            Ok(())
        }
        async fn worktree_prune(&self, _repo_root: &Path) -> Result<()> {
            Ok(())
        }
        async fn branch_exists(&self, _repo_root: &Path, _branch: &str) -> Result<bool> {
            Ok(false)
        }
        async fn is_branch_merged(&self, _repo_root: &Path, _branch: &str) -> Result<bool> {
            Ok(self.merged.load(Ordering::SeqCst))
        }
        async fn has_uncommitted_changes(&self, _repo_root: &Path) -> Result<bool> {
            Ok(self.dirty.load(Ordering::SeqCst))
        }
    }

    fn manager(git: Arc<FakeGit>) -> (WorktreeManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (WorktreeManager::new(git, dir.path().to_path_buf()), dir)
    }

    #[tokio::test]
    async fn rejects_invalid_branch_names_before_touching_git() {
        let git = Arc::new(FakeGit {
            merged: AtomicBool::new(true),
            dirty: AtomicBool::new(false),
            added: Mutex::new(vec![]),
        });
        let (mgr, _dir) = manager(git.clone());
        let session = SessionId::new("mattermost", "thread1");
        let result = mgr.create(&session, Path::new("/repo"), "-bad").await;
        assert!(result.is_err());
        assert!(git.added.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cleanup_refuses_dirty_worktree() {
        let git = Arc::new(FakeGit {
            merged: AtomicBool::new(true),
            dirty: AtomicBool::new(true),
            added: Mutex::new(vec![]),
        });
        let (mgr, _dir) = manager(git);
        let verdict = mgr.cleanup_eligible(Path::new("/repo"), "feature/x").await.unwrap();
        assert!(verdict.is_err());
    }

    #[tokio::test]
    async fn cleanup_refuses_unmerged_branch() {
        let git = Arc::new(FakeGit {
            merged: AtomicBool::new(false),
            dirty: AtomicBool::new(false),
            added: Mutex::new(vec![]),
        });
        let (mgr, _dir) = manager(git);
        let verdict = mgr.cleanup_eligible(Path::new("/repo"), "feature/x").await.unwrap();
        assert!(verdict.is_err());
    }
}
