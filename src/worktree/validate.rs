//! Branch-name and worktree-path validation (§4.7, §8 boundary behaviors).

/// `git check-ref-format`-equivalent validation for worktree branch names.
pub fn is_valid_branch_name(name: &str) -> bool {
    if name.is_empty() || name == "@" {
        return false;
    }
    if name.starts_with('/') || name.starts_with('-') {
        return false;
    }
    if name.ends_with(".lock") || name.ends_with('/') {
        return false;
    }
    if name.contains("..") || name.contains("@{") {
        return false;
    }
    if name.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return false;
    }
    const FORBIDDEN: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];
    if name.chars().any(|c| FORBIDDEN.contains(&c)) {
        return false;
    }
    true
}

/// Reject any worktree path outside the central worktree root, so
/// destructive operations (removal, cleanup) never touch a user-owned
/// directory.
pub fn is_valid_worktree_path(path: &std::path::Path, worktree_root: &std::path::Path) -> bool {
    path.starts_with(worktree_root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_good_branch_names() {
        for name in ["main", "feature/x", "release-1.0.0"] {
            assert!(is_valid_branch_name(name), "{name} should be accepted");
        }
    }

    #[test]
    fn rejects_known_bad_branch_names() {
        for name in ["-x", "x..y", "x/", "/x", "@", "x.lock", "x y", "x~y", "x^y", "x:y", "x?y", "x*y", "x[y", "x\\y"] {
            assert!(!is_valid_branch_name(name), "{name} should be rejected");
        }
    }

    #[test]
    fn worktree_path_must_live_under_root() {
        let root = std::path::Path::new("/home/user/.threadbridge/worktrees");
        assert!(is_valid_worktree_path(
            std::path::Path::new("/home/user/.threadbridge/worktrees/repo--branch-ab12cd34"),
            root
        ));
        assert!(!is_valid_worktree_path(std::path::Path::new("/home/user/projects/myrepo"), root));
    }
}
