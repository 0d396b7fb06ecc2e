//! Session lifecycle operations: start, resume, kill, cancel, interrupt
//! (§4.11).

use super::registry::SessionRegistry;
use super::types::Session;
use crate::ai::AiProcess;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{Result, SessionError};
use crate::process::ProcessSpawner;
use crate::store::{SessionSnapshot, SessionStore};
use crate::{SessionId, SessionState};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

const MAX_RESUME_FAIL_COUNT: u32 = 3;

/// Owns the live AI child handles keyed by session, outside the `Session`
/// struct itself so snapshots stay trivially cloneable/serializable.
pub struct SessionLifecycle {
    registry: Arc<SessionRegistry>,
    store: Arc<SessionStore>,
    spawner: Arc<dyn ProcessSpawner>,
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
    children: Mutex<HashMap<SessionId, Arc<AiProcess>>>,
}

impl SessionLifecycle {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<SessionStore>,
        spawner: Arc<dyn ProcessSpawner>,
        config: Arc<Config>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            spawner,
            config,
            clock,
            children: Mutex::new(HashMap::new()),
        }
    }

    /// Create a brand-new session, spawn its AI child, and persist it.
    /// Posting the session header and registering the post with the router
    /// are the caller's responsibility (they depend on the platform
    /// adapter, which this module doesn't own).
    pub async fn start_session(
        &self,
        platform_id: &str,
        thread_id: &str,
        starter_username: &str,
        working_dir: PathBuf,
        session_number: u64,
    ) -> Result<(Session, mpsc::Receiver<crate::ai::AiEvent>)> {
        let id = SessionId::new(platform_id, thread_id);
        if self.registry.find(platform_id, thread_id).is_some() {
            return Err(SessionError::AlreadyExists(id.0).into());
        }

        let now = self.clock.now();
        let session = Session::new(id.clone(), starter_username.to_string(), working_dir.clone(), session_number, now);

        let ai = Arc::new(AiProcess::new(
            self.spawner.clone(),
            self.config.ai_cli.clone(),
            session.ai_session_uuid,
            working_dir,
            None,
        ));
        let events = ai.start(false).await?;

        self.children.lock().await.insert(id.clone(), ai);
        self.registry.register(session.clone());
        self.persist(&session).await?;
        Ok((session, events))
    }

    /// Re-instantiate a session from its persisted snapshot and start a
    /// fresh AI child with `--resume`. On the third consecutive failure the
    /// session is soft-deleted instead of retried again (§4.11).
    pub async fn resume_session(
        &self,
        snapshot: SessionSnapshot,
    ) -> Result<Option<(Session, mpsc::Receiver<crate::ai::AiEvent>)>> {
        let id = SessionId::new(&snapshot.platform_id, &snapshot.thread_id);
        let working_dir = PathBuf::from(&snapshot.working_dir);
        let ai_session_uuid = snapshot
            .ai_session_uuid
            .parse()
            .map_err(|_| SessionError::NoProcess(id.0.clone()))?;

        let ai = Arc::new(AiProcess::new(
            self.spawner.clone(),
            self.config.ai_cli.clone(),
            ai_session_uuid,
            working_dir.clone(),
            None,
        ));

        match ai.start(true).await {
            Ok(events) => {
                let mut session = Session::new(
                    id.clone(),
                    String::new(),
                    working_dir,
                    0,
                    self.clock.now(),
                );
                session.ai_session_uuid = ai_session_uuid;
                session.resume_fail_count = 0;
                session.state = SessionState::Active;
                session.session_start_post_id = snapshot.session_start_post_id.clone();
                session.lifecycle_post_id = snapshot.lifecycle_post_id.clone();
                session.worktree = snapshot.worktree.clone();
                session.permissions_interactive = snapshot.permissions_interactive;

                self.children.lock().await.insert(id.clone(), ai);
                self.registry.register(session.clone());
                self.persist(&session).await?;
                Ok(Some((session, events)))
            }
            Err(e) => {
                let fail_count = snapshot.resume_fail_count + 1;
                if fail_count >= MAX_RESUME_FAIL_COUNT {
                    self.store.soft_delete(&id.0, self.clock.now()).await?;
                    Ok(None)
                } else {
                    let mut updated = snapshot;
                    updated.resume_fail_count = fail_count;
                    self.store.save(&id.0, updated).await?;
                    Err(e)
                }
            }
        }
    }

    /// SIGTERM the child, remove from the registry, and either soft-delete
    /// (`unpersist=true`) or leave the snapshot for resume.
    pub async fn kill_session(&self, id: &SessionId, unpersist: bool) -> Result<()> {
        if let Some(ai) = self.children.lock().await.remove(id) {
            ai.kill().await;
        }
        self.registry.unregister(id);
        if unpersist {
            self.store.soft_delete(&id.0, self.clock.now()).await?;
        }
        Ok(())
    }

    /// `!stop` or an X reaction: lifecycle → cancelling, SIGTERM, soft-delete.
    pub async fn cancel_session(&self, id: &SessionId) -> Result<()> {
        self.registry.with_mut(id, |s| s.state = SessionState::Cancelling)?;
        self.kill_session(id, true).await
    }

    /// `!escape` or a pause reaction: SIGINT the child; the session stays
    /// registered in `interrupted` state until the next user message.
    pub async fn interrupt_session(&self, id: &SessionId) -> Result<bool> {
        let interrupted = if let Some(ai) = self.children.lock().await.get(id) {
            ai.interrupt().await
        } else {
            false
        };
        self.registry.with_mut(id, |s| s.state = SessionState::Interrupted)?;
        Ok(interrupted)
    }

    pub async fn child_for(&self, id: &SessionId) -> Option<Arc<AiProcess>> {
        self.children.lock().await.get(id).cloned()
    }

    async fn persist(&self, session: &Session) -> Result<()> {
        self.store.save(&session.id.0, to_snapshot(session)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::error::ProcessError;
    use crate::process::spawner::{SpawnSpec, SpawnedChild, TokioSpawner};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Spawns a real but trivial `sleep` subprocess in place of the AI CLI
    /// binary, so `AiProcess::start` gets a genuine child with working
    /// stdin/stdout pipes without needing the AI CLI itself installed. Fails
    /// the first `fail_first_n` calls outright instead, for exercising the
    /// resume-fail-count path.
    struct ScriptedSpawner {
        attempts: AtomicUsize,
        fail_first_n: usize,
    }

    impl ScriptedSpawner {
        fn always_succeeds() -> Arc<Self> {
            Arc::new(Self { attempts: AtomicUsize::new(0), fail_first_n: 0 })
        }

        fn fails(n: usize) -> Arc<Self> {
            Arc::new(Self { attempts: AtomicUsize::new(0), fail_first_n: n })
        }
    }

    #[async_trait::async_trait]
    impl ProcessSpawner for ScriptedSpawner {
        async fn spawn(&self, _spec: &SpawnSpec) -> Result<SpawnedChild> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first_n {
                return Err(ProcessError::Spawn("scripted failure".into()).into());
            }
            let spec = SpawnSpec {
                command: "sleep".into(),
                args: vec!["5".into()],
                working_dir: std::env::temp_dir(),
                env: HashMap::new(),
            };
            TokioSpawner.spawn(&spec).await
        }
    }

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            data_dir: std::env::temp_dir(),
            ai_cli: crate::config::AiCliConfig {
                command: "sleep".into(),
                extra_args: Vec::new(),
                skip_permissions: false,
                system_prompt_append: None,
                shutdown_grace: std::time::Duration::from_millis(200),
            },
            session: crate::config::SessionConfig::default(),
            cleanup: crate::config::CleanupConfig::default(),
            update: crate::config::UpdateConfig::default(),
        })
    }

    fn harness(spawner: Arc<dyn ProcessSpawner>) -> (SessionLifecycle, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = SessionLifecycle::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(SessionStore::new(dir.path().join("sessions.json"))),
            spawner,
            test_config(),
            FakeClock::new(Utc::now()),
        );
        (lifecycle, dir)
    }

    #[tokio::test]
    async fn start_session_registers_exactly_one_child() {
        let (lifecycle, _dir) = harness(ScriptedSpawner::always_succeeds());
        let (session, _events) = lifecycle
            .start_session("mattermost", "t1", "alice", std::env::temp_dir(), 1)
            .await
            .unwrap();

        assert!(lifecycle.registry.find("mattermost", "t1").is_some());
        assert!(lifecycle.child_for(&session.id).await.is_some());
        assert_eq!(lifecycle.children.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn start_session_twice_for_the_same_thread_is_rejected() {
        let (lifecycle, _dir) = harness(ScriptedSpawner::always_succeeds());
        lifecycle
            .start_session("mattermost", "t1", "alice", std::env::temp_dir(), 1)
            .await
            .unwrap();

        let second = lifecycle.start_session("mattermost", "t1", "bob", std::env::temp_dir(), 2).await;
        assert!(second.is_err(), "exactly one AI child per session");
        assert_eq!(lifecycle.children.lock().await.len(), 1);
    }

    fn snapshot_for(id: &SessionId, resume_fail_count: u32) -> SessionSnapshot {
        let now = Utc::now();
        SessionSnapshot {
            session_id: id.0.clone(),
            platform_id: id.platform_id().to_string(),
            thread_id: id.thread_id().to_string(),
            ai_session_uuid: uuid::Uuid::new_v4().to_string(),
            working_dir: std::env::temp_dir().display().to_string(),
            worktree: None,
            state: SessionState::Interrupted,
            created_at: now,
            last_activity_at: now,
            timeout_warning_posted: false,
            session_start_post_id: Some("post-1".into()),
            lifecycle_post_id: None,
            resume_fail_count,
            permissions_interactive: false,
            cleaned_at: None,
        }
    }

    #[tokio::test]
    async fn resume_session_restores_fields_and_resets_fail_count() {
        let (lifecycle, _dir) = harness(ScriptedSpawner::always_succeeds());
        let id = SessionId::new("mattermost", "t1");
        let snapshot = snapshot_for(&id, 2);

        let (session, _events) = lifecycle.resume_session(snapshot).await.unwrap().unwrap();

        assert_eq!(session.resume_fail_count, 0);
        assert_eq!(session.state, SessionState::Active);
        assert_eq!(session.session_start_post_id.as_deref(), Some("post-1"));
        assert!(lifecycle.registry.find("mattermost", "t1").is_some());
    }

    #[tokio::test]
    async fn resume_session_failure_increments_fail_count_and_persists_it() {
        let (lifecycle, _dir) = harness(ScriptedSpawner::fails(1));
        let id = SessionId::new("mattermost", "t1");
        let snapshot = snapshot_for(&id, 0);

        let result = lifecycle.resume_session(snapshot).await;
        assert!(result.is_err());

        let persisted = lifecycle.store.find_by_thread("mattermost", "t1").await.unwrap().unwrap();
        assert_eq!(persisted.resume_fail_count, 1);
        assert!(persisted.cleaned_at.is_none());
    }

    #[tokio::test]
    async fn resume_session_soft_deletes_on_the_third_consecutive_failure() {
        let (lifecycle, _dir) = harness(ScriptedSpawner::fails(usize::MAX));
        let id = SessionId::new("mattermost", "t1");

        let mut snapshot = snapshot_for(&id, 0);
        for expected_fail_count in 1..MAX_RESUME_FAIL_COUNT {
            let err = lifecycle.resume_session(snapshot.clone()).await;
            assert!(err.is_err());
            snapshot = lifecycle.store.find_by_thread("mattermost", "t1").await.unwrap().unwrap();
            assert_eq!(snapshot.resume_fail_count, expected_fail_count);
            assert!(snapshot.cleaned_at.is_none());
        }

        let outcome = lifecycle.resume_session(snapshot).await.unwrap();
        assert!(outcome.is_none(), "third consecutive failure soft-deletes instead of retrying");

        let persisted = lifecycle.store.find_by_thread("mattermost", "t1").await.unwrap().unwrap();
        assert!(persisted.cleaned_at.is_some());
    }

    #[tokio::test]
    async fn kill_session_removes_the_child_and_unregisters() {
        let (lifecycle, _dir) = harness(ScriptedSpawner::always_succeeds());
        let (session, _events) = lifecycle
            .start_session("mattermost", "t1", "alice", std::env::temp_dir(), 1)
            .await
            .unwrap();

        lifecycle.kill_session(&session.id, false).await.unwrap();

        assert!(lifecycle.child_for(&session.id).await.is_none());
        assert!(lifecycle.registry.find("mattermost", "t1").is_none());
        let persisted = lifecycle.store.find_by_thread("mattermost", "t1").await.unwrap().unwrap();
        assert!(persisted.cleaned_at.is_none(), "unpersist=false leaves the snapshot resumable");
    }

    #[tokio::test]
    async fn cancel_session_soft_deletes_the_snapshot() {
        let (lifecycle, _dir) = harness(ScriptedSpawner::always_succeeds());
        let (session, _events) = lifecycle
            .start_session("mattermost", "t1", "alice", std::env::temp_dir(), 1)
            .await
            .unwrap();

        lifecycle.cancel_session(&session.id).await.unwrap();

        let persisted = lifecycle.store.find_by_thread("mattermost", "t1").await.unwrap().unwrap();
        assert!(persisted.cleaned_at.is_some());
    }

    #[tokio::test]
    async fn interrupt_session_keeps_the_child_and_marks_state_interrupted() {
        let (lifecycle, _dir) = harness(ScriptedSpawner::always_succeeds());
        let (session, _events) = lifecycle
            .start_session("mattermost", "t1", "alice", std::env::temp_dir(), 1)
            .await
            .unwrap();

        let interrupted = lifecycle.interrupt_session(&session.id).await.unwrap();
        assert!(interrupted);
        assert!(lifecycle.child_for(&session.id).await.is_some());

        let live = lifecycle.registry.find("mattermost", "t1").unwrap();
        assert_eq!(live.state, SessionState::Interrupted);
    }
}

fn to_snapshot(session: &Session) -> SessionSnapshot {
    SessionSnapshot {
        session_id: session.id.0.clone(),
        platform_id: session.id.platform_id().to_string(),
        thread_id: session.id.thread_id().to_string(),
        ai_session_uuid: session.ai_session_uuid.to_string(),
        working_dir: session.working_dir.display().to_string(),
        worktree: session.worktree.clone(),
        state: session.state,
        created_at: session.started_at,
        last_activity_at: session.last_activity_at,
        timeout_warning_posted: session.timeout_warning_posted,
        session_start_post_id: session.session_start_post_id.clone(),
        lifecycle_post_id: session.lifecycle_post_id.clone(),
        resume_fail_count: session.resume_fail_count,
        permissions_interactive: session.permissions_interactive,
        cleaned_at: None,
    }
}
