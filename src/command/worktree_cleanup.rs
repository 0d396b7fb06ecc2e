//! `!worktree cleanup` sole-owner check (§9 Open Question 3): refuse unless
//! the requesting session is the only live session bound to the worktree,
//! and the worktree itself is otherwise eligible (merged, no uncommitted
//! changes). Combines `SessionRegistry::is_sole_worktree_owner` with
//! `WorktreeManager::cleanup_eligible` rather than duplicating either check.

use crate::error::Result;
use crate::session::SessionRegistry;
use crate::worktree::WorktreeManager;
use crate::SessionId;
use std::path::Path;

/// `Ok(Ok(()))` means the cleanup may proceed; `Ok(Err(reason))` is a
/// user-facing refusal; `Err` is an unexpected git/IO failure.
pub async fn check_worktree_cleanup(
    registry: &SessionRegistry,
    manager: &WorktreeManager,
    requester: &SessionId,
    repo_root: &Path,
    worktree_path: &Path,
    branch: &str,
) -> Result<std::result::Result<(), String>> {
    if !registry.is_sole_worktree_owner(requester, worktree_path) {
        return Ok(Err("another active session is using this worktree".to_string()));
    }
    manager.cleanup_eligible(repo_root, branch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worktree::{GitRunner, WorktreeEntry};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeGit {
        merged: bool,
        dirty: bool,
    }

    #[async_trait]
    impl GitRunner for FakeGit {
        async fn worktree_list(&self, _repo_root: &Path) -> Result<Vec<WorktreeEntry>> {
            Ok(vec![])
        }
        async fn worktree_add(&self, _repo_root: &Path, _worktree_path: &Path, _branch: &str, _create_branch: bool) -> Result<()> {
            Ok(())
        }
        async fn worktree_remove(&self, _repo_root: &Path, _worktree_path: &Path, _force: bool) -> Result<()> {
            Ok(())
        }
        async fn worktree_prune(&self, _repo_root: &Path) -> Result<()> {
            Ok(())
        }
        async fn branch_exists(&self, _repo_root: &Path, _branch: &str) -> Result<bool> {
            Ok(true)
        }
        async fn is_branch_merged(&self, _repo_root: &Path, _branch: &str) -> Result<bool> {
            Ok(self.merged)
        }
        async fn has_uncommitted_changes(&self, _repo_root: &Path) -> Result<bool> {
            Ok(self.dirty)
        }
    }

    fn sample_session(platform: &str, thread: &str) -> crate::session::Session {
        crate::session::Session::new(SessionId::new(platform, thread), "alice".into(), PathBuf::from("/tmp"), 1, Utc::now())
    }

    fn bind_worktree(registry: &SessionRegistry, id: &SessionId, path: &str) {
        registry
            .with_mut(id, |s| {
                s.worktree = Some(crate::WorktreeInfo {
                    repo_root: PathBuf::from("/repo"),
                    worktree_path: PathBuf::from(path),
                    branch: "feature".into(),
                })
            })
            .unwrap();
    }

    #[tokio::test]
    async fn refuses_when_another_session_shares_the_worktree() {
        let registry = SessionRegistry::new();
        let a = SessionId::new("mattermost", "t1");
        let b = SessionId::new("mattermost", "t2");
        registry.register(sample_session("mattermost", "t1"));
        registry.register(sample_session("mattermost", "t2"));
        bind_worktree(&registry, &a, "/worktrees/shared");
        bind_worktree(&registry, &b, "/worktrees/shared");

        let manager = WorktreeManager::new(Arc::new(FakeGit { merged: true, dirty: false }), PathBuf::from("/worktrees"));
        let outcome = check_worktree_cleanup(&registry, &manager, &a, Path::new("/repo"), Path::new("/worktrees/shared"), "feature")
            .await
            .unwrap();
        assert_eq!(outcome, Err("another active session is using this worktree".to_string()));
    }

    #[tokio::test]
    async fn refuses_when_branch_unmerged_but_sole_owner() {
        let registry = SessionRegistry::new();
        let a = SessionId::new("mattermost", "t1");
        registry.register(sample_session("mattermost", "t1"));
        bind_worktree(&registry, &a, "/worktrees/solo");

        let manager = WorktreeManager::new(Arc::new(FakeGit { merged: false, dirty: false }), PathBuf::from("/worktrees"));
        let outcome = check_worktree_cleanup(&registry, &manager, &a, Path::new("/repo"), Path::new("/worktrees/solo"), "feature")
            .await
            .unwrap();
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn allows_when_sole_owner_and_merged() {
        let registry = SessionRegistry::new();
        let a = SessionId::new("mattermost", "t1");
        registry.register(sample_session("mattermost", "t1"));
        bind_worktree(&registry, &a, "/worktrees/solo");

        let manager = WorktreeManager::new(Arc::new(FakeGit { merged: true, dirty: false }), PathBuf::from("/worktrees"));
        let outcome = check_worktree_cleanup(&registry, &manager, &a, Path::new("/repo"), Path::new("/worktrees/solo"), "feature")
            .await
            .unwrap();
        assert_eq!(outcome, Ok(()));
    }
}
