//! Injected git-command-runner boundary (REDESIGN FLAGS: replace dynamic
//! module-mocking of the git/subprocess layer with an interface boundary;
//! production implementations call the OS, tests provide deterministic
//! fakes).

use crate::error::{Result, WorktreeError};
use std::path::{Path, PathBuf};

/// One entry from `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    pub branch: Option<String>,
}

/// The subset of git operations the worktree manager needs.
#[async_trait::async_trait]
pub trait GitRunner: Send + Sync {
    async fn worktree_list(&self, repo_root: &Path) -> Result<Vec<WorktreeEntry>>;
    async fn worktree_add(&self, repo_root: &Path, worktree_path: &Path, branch: &str, create_branch: bool) -> Result<()>;
    async fn worktree_remove(&self, repo_root: &Path, worktree_path: &Path, force: bool) -> Result<()>;
    async fn worktree_prune(&self, repo_root: &Path) -> Result<()>;
    async fn branch_exists(&self, repo_root: &Path, branch: &str) -> Result<bool>;
    /// True iff `branch`'s tip is an ancestor of the repository's default branch.
    async fn is_branch_merged(&self, repo_root: &Path, branch: &str) -> Result<bool>;
    async fn has_uncommitted_changes(&self, repo_root: &Path) -> Result<bool>;
}

/// Calls the real `git` binary via subprocess.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl SystemGit {
    async fn run(&self, repo_root: &Path, args: &[&str]) -> Result<std::process::Output> {
        tokio::process::Command::new("git")
            .args(args)
            .current_dir(repo_root)
            .output()
            .await
            .map_err(|e| WorktreeError::GitCommand(format!("git {}: {e}", args.join(" "))).into())
    }

    async fn run_ok(&self, repo_root: &Path, args: &[&str]) -> Result<()> {
        let output = self.run(repo_root, args).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(WorktreeError::GitCommand(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr)
            ))
            .into())
        }
    }

    /// `origin/HEAD` with fallback to `main`, then `master`.
    async fn default_branch(&self, repo_root: &Path) -> Result<String> {
        if let Ok(output) = self
            .run(repo_root, &["symbolic-ref", "--short", "refs/remotes/origin/HEAD"])
            .await
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if let Some(short) = name.strip_prefix("origin/") {
                    return Ok(short.to_string());
                }
            }
        }
        for candidate in ["main", "master"] {
            if self.branch_exists(repo_root, candidate).await.unwrap_or(false) {
                return Ok(candidate.to_string());
            }
        }
        Ok("main".to_string())
    }
}

#[async_trait::async_trait]
impl GitRunner for SystemGit {
    async fn worktree_list(&self, repo_root: &Path) -> Result<Vec<WorktreeEntry>> {
        let output = self.run(repo_root, &["worktree", "list", "--porcelain"]).await?;
        Ok(parse_porcelain(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn worktree_add(&self, repo_root: &Path, worktree_path: &Path, branch: &str, create_branch: bool) -> Result<()> {
        let path_str = worktree_path.to_string_lossy().into_owned();
        let mut args = vec!["worktree", "add"];
        if create_branch {
            args.push("-b");
            args.push(branch);
            args.push(&path_str);
        } else {
            args.push(&path_str);
            args.push(branch);
        }
        self.run_ok(repo_root, &args).await
    }

    async fn worktree_remove(&self, repo_root: &Path, worktree_path: &Path, force: bool) -> Result<()> {
        let path_str = worktree_path.to_string_lossy().into_owned();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path_str);
        self.run_ok(repo_root, &args).await
    }

    async fn worktree_prune(&self, repo_root: &Path) -> Result<()> {
        self.run_ok(repo_root, &["worktree", "prune"]).await
    }

    async fn branch_exists(&self, repo_root: &Path, branch: &str) -> Result<bool> {
        let output = self
            .run(repo_root, &["show-ref", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .await?;
        Ok(output.status.success())
    }

    async fn is_branch_merged(&self, repo_root: &Path, branch: &str) -> Result<bool> {
        let base = self.default_branch(repo_root).await?;
        let output = self
            .run(repo_root, &["merge-base", "--is-ancestor", branch, &base])
            .await?;
        Ok(output.status.success())
    }

    async fn has_uncommitted_changes(&self, repo_root: &Path) -> Result<bool> {
        let output = self.run(repo_root, &["status", "--porcelain"]).await?;
        Ok(!output.stdout.is_empty())
    }
}

fn parse_porcelain(output: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut path: Option<PathBuf> = None;
    let mut branch: Option<String> = None;

    for line in output.lines() {
        if let Some(p) = line.strip_prefix("worktree ") {
            if let Some(path) = path.take() {
                entries.push(WorktreeEntry { path, branch: branch.take() });
            }
            path = Some(PathBuf::from(p));
        } else if let Some(b) = line.strip_prefix("branch ") {
            branch = Some(b.trim_start_matches("refs/heads/").to_string());
        } else if line.is_empty() {
            if let Some(path) = path.take() {
                entries.push(WorktreeEntry { path, branch: branch.take() });
            }
        }
    }
    if let Some(path) = path.take() {
        entries.push(WorktreeEntry { path, branch: branch.take() });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_porcelain_worktree_list() {
        let output = "worktree /repo\nHEAD abc123\nbranch refs/heads/main\n\nworktree /repo/.wt/feature\nHEAD def456\nbranch refs/heads/feature/x\n\n";
        let entries = parse_porcelain(output);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].branch.as_deref(), Some("main"));
        assert_eq!(entries[1].branch.as_deref(), Some("feature/x"));
    }
}
