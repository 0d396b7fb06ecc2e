//! In-memory `(platformId, threadId) → session` map plus a post→thread
//! index (§4.2). All mutation is expected to happen on a single owner task;
//! the mutex exists only so the registry can be shared across tasks that
//! merely read.

use super::types::Session;
use crate::error::{Result, SessionError};
use crate::{PostId, SessionId, ThreadId};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, Session>,
    post_to_thread: HashMap<PostId, ThreadId>,
}

pub struct SessionRegistry {
    inner: Mutex<Inner>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn register(&self, session: Session) {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.insert(session.id.clone(), session);
    }

    pub fn unregister(&self, id: &SessionId) -> Option<Session> {
        let mut inner = self.inner.lock().unwrap();
        let removed = inner.sessions.remove(id);
        inner.post_to_thread.retain(|_, thread_id| {
            removed
                .as_ref()
                .map(|s| s.id.thread_id() != *thread_id)
                .unwrap_or(true)
        });
        removed
    }

    pub fn find(&self, platform_id: &str, thread_id: &str) -> Option<Session> {
        let inner = self.inner.lock().unwrap();
        inner.sessions.get(&SessionId::new(platform_id, thread_id)).cloned()
    }

    pub fn find_by_thread_id(&self, thread_id: &str) -> Option<Session> {
        let inner = self.inner.lock().unwrap();
        inner.sessions.values().find(|s| s.id.thread_id() == thread_id).cloned()
    }

    pub fn find_by_post(&self, post_id: &str) -> Option<Session> {
        let inner = self.inner.lock().unwrap();
        let thread_id = inner.post_to_thread.get(post_id)?;
        inner.sessions.values().find(|s| s.id.thread_id() == *thread_id).cloned()
    }

    pub fn register_post(&self, post_id: PostId, thread_id: ThreadId) {
        let mut inner = self.inner.lock().unwrap();
        inner.post_to_thread.insert(post_id, thread_id);
    }

    pub fn unregister_post(&self, post_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.post_to_thread.remove(post_id);
    }

    pub fn clear_posts_for_thread(&self, thread_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.post_to_thread.retain(|_, t| t != thread_id);
    }

    pub fn get_for_platform(&self, platform_id: &str) -> Vec<Session> {
        let inner = self.inner.lock().unwrap();
        inner
            .sessions
            .values()
            .filter(|s| s.id.platform_id() == platform_id)
            .cloned()
            .collect()
    }

    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    /// Most recent `lastActivityAt` across all live sessions, used by the
    /// auto-update coordinator's idle/quiet timing (§4.9).
    pub fn last_activity(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.inner.lock().unwrap().sessions.values().map(|s| s.last_activity_at).max()
    }

    /// Worktree paths bound to any live session on any platform, used by the
    /// cleanup scheduler to tell orphaned worktrees from in-use ones (§4.8).
    pub fn active_worktree_paths(&self) -> std::collections::HashSet<std::path::PathBuf> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .values()
            .filter_map(|s| s.worktree.as_ref().map(|w| w.worktree_path.clone()))
            .collect()
    }

    /// True iff `requester` is the only live session anywhere bound to
    /// `worktree_path`, i.e. `!worktree cleanup` is safe to honor. A session
    /// not currently bound to any worktree is never the sole owner of one.
    pub fn is_sole_worktree_owner(&self, requester: &SessionId, worktree_path: &std::path::Path) -> bool {
        let inner = self.inner.lock().unwrap();
        let Some(requester_session) = inner.sessions.get(requester) else {
            return false;
        };
        match &requester_session.worktree {
            Some(w) if w.worktree_path == worktree_path => {}
            _ => return false,
        }
        !inner
            .sessions
            .iter()
            .any(|(id, s)| id != requester && s.worktree.as_ref().is_some_and(|w| w.worktree_path == worktree_path))
    }

    /// Mutate a live session in place. Returns `SessionError::NotFound` if
    /// the session isn't registered.
    pub fn with_mut<F, T>(&self, id: &SessionId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> T,
    {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.0.clone()))?;
        Ok(f(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(platform: &str, thread: &str) -> Session {
        Session::new(
            SessionId::new(platform, thread),
            "alice".into(),
            std::path::PathBuf::from("/tmp"),
            1,
            Utc::now(),
        )
    }

    #[test]
    fn register_then_find_round_trips() {
        let registry = SessionRegistry::new();
        registry.register(sample("mattermost", "t1"));
        assert!(registry.find("mattermost", "t1").is_some());
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn find_by_post_uses_the_post_index() {
        let registry = SessionRegistry::new();
        registry.register(sample("mattermost", "t1"));
        registry.register_post("post-9".into(), "t1".into());
        let found = registry.find_by_post("post-9");
        assert!(found.is_some());
        assert_eq!(found.unwrap().id.thread_id(), "t1");
    }

    #[test]
    fn unregister_removes_session_and_its_posts() {
        let registry = SessionRegistry::new();
        registry.register(sample("mattermost", "t1"));
        registry.register_post("post-9".into(), "t1".into());
        registry.unregister(&SessionId::new("mattermost", "t1"));
        assert_eq!(registry.size(), 0);
        assert!(registry.find_by_post("post-9").is_none());
    }

    fn set_worktree(registry: &SessionRegistry, id: &SessionId, path: &str) {
        registry
            .with_mut(id, |s| {
                s.worktree = Some(crate::WorktreeInfo {
                    repo_root: std::path::PathBuf::from("/repo"),
                    worktree_path: std::path::PathBuf::from(path),
                    branch: "feature".into(),
                });
            })
            .unwrap();
    }

    #[test]
    fn sole_owner_when_no_other_session_shares_the_path() {
        let registry = SessionRegistry::new();
        let id = SessionId::new("mattermost", "t1");
        registry.register(sample("mattermost", "t1"));
        set_worktree(&registry, &id, "/worktrees/a");
        assert!(registry.is_sole_worktree_owner(&id, std::path::Path::new("/worktrees/a")));
    }

    #[test]
    fn not_sole_owner_when_another_session_shares_the_path() {
        let registry = SessionRegistry::new();
        let a = SessionId::new("mattermost", "t1");
        let b = SessionId::new("mattermost", "t2");
        registry.register(sample("mattermost", "t1"));
        registry.register(sample("mattermost", "t2"));
        set_worktree(&registry, &a, "/worktrees/shared");
        set_worktree(&registry, &b, "/worktrees/shared");
        assert!(!registry.is_sole_worktree_owner(&a, std::path::Path::new("/worktrees/shared")));
    }

    #[test]
    fn not_owner_when_session_bound_to_a_different_path() {
        let registry = SessionRegistry::new();
        let id = SessionId::new("mattermost", "t1");
        registry.register(sample("mattermost", "t1"));
        set_worktree(&registry, &id, "/worktrees/a");
        assert!(!registry.is_sole_worktree_owner(&id, std::path::Path::new("/worktrees/other")));
    }
}
