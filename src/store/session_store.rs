//! Atomic file-backed session store: every write goes to a temp file in the
//! same directory, then an atomic rename, so a reader never observes a
//! partially-written document.

use super::snapshot::{SessionSnapshot, StoreDocument};
use crate::error::{Result, StoreError};
use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub struct SessionStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles against the backing file; a
    /// single-process store never needs cross-process locking.
    guard: Mutex<()>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            guard: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<StoreDocument> {
        let _lock = self.guard.lock().await;
        self.load_locked().await
    }

    async fn load_locked(&self) -> Result<StoreDocument> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreDocument::default()),
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.path.display().to_string(),
                    source: e,
                }
                .into())
            }
        };

        if contents.trim().is_empty() {
            return Ok(StoreDocument::default());
        }

        let mut doc: StoreDocument =
            serde_json::from_str(&contents).map_err(|e| StoreError::Parse(e.to_string()))?;

        if doc.migrate() {
            self.write_locked(&doc).await?;
        }

        Ok(doc)
    }

    async fn write_locked(&self, doc: &StoreDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(doc).map_err(|e| StoreError::Write(e.to_string()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json.as_bytes())
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            StoreError::Write(format!("rename {} -> {}: {e}", tmp_path.display(), self.path.display()))
        })?;
        Ok(())
    }

    pub async fn save(&self, session_id: &str, snapshot: SessionSnapshot) -> Result<()> {
        let _lock = self.guard.lock().await;
        let mut doc = self.load_locked().await?;
        doc.sessions.insert(session_id.to_string(), snapshot);
        self.write_locked(&doc).await
    }

    pub async fn remove(&self, session_id: &str) -> Result<()> {
        let _lock = self.guard.lock().await;
        let mut doc = self.load_locked().await?;
        doc.sessions.remove(session_id);
        self.write_locked(&doc).await
    }

    pub async fn soft_delete(&self, session_id: &str, now: DateTime<Utc>) -> Result<()> {
        let _lock = self.guard.lock().await;
        let mut doc = self.load_locked().await?;
        if let Some(snapshot) = doc.sessions.get_mut(session_id) {
            snapshot.cleaned_at = Some(now);
        }
        self.write_locked(&doc).await
    }

    /// Soft-delete every row whose `last_activity_at` is older than
    /// `max_age`. Returns the affected session IDs.
    pub async fn clean_stale(&self, max_age: Duration, now: DateTime<Utc>) -> Result<Vec<String>> {
        let _lock = self.guard.lock().await;
        let mut doc = self.load_locked().await?;
        let cutoff = now - max_age;
        let mut affected = Vec::new();
        for (id, snapshot) in doc.sessions.iter_mut() {
            if snapshot.cleaned_at.is_none() && snapshot.last_activity_at < cutoff {
                snapshot.cleaned_at = Some(now);
                affected.push(id.clone());
            }
        }
        if !affected.is_empty() {
            self.write_locked(&doc).await?;
        }
        Ok(affected)
    }

    /// Purge soft-deleted rows past `retention`.
    pub async fn clean_history(&self, retention: Duration, now: DateTime<Utc>) -> Result<Vec<String>> {
        let _lock = self.guard.lock().await;
        let mut doc = self.load_locked().await?;
        let cutoff = now - retention;
        let mut purged = Vec::new();
        doc.sessions.retain(|id, snapshot| {
            let expired = snapshot.cleaned_at.map(|at| at < cutoff).unwrap_or(false);
            if expired {
                purged.push(id.clone());
            }
            !expired
        });
        if !purged.is_empty() {
            self.write_locked(&doc).await?;
        }
        Ok(purged)
    }

    pub async fn find_by_thread(&self, platform_id: &str, thread_id: &str) -> Result<Option<SessionSnapshot>> {
        let doc = self.load().await?;
        Ok(doc.sessions.get(&format!("{platform_id}:{thread_id}")).cloned())
    }

    pub async fn find_by_post_id(&self, post_id: &str) -> Result<Option<SessionSnapshot>> {
        let doc = self.load().await?;
        Ok(doc
            .sessions
            .values()
            .find(|s| s.session_start_post_id.as_deref() == Some(post_id) || s.lifecycle_post_id.as_deref() == Some(post_id))
            .cloned())
    }

    /// Recent soft-deleted and timed-out rows for a platform, newest first,
    /// excluding anything still in the live registry.
    pub async fn history(&self, platform_id: &str, active_ids: &[String]) -> Result<Vec<SessionSnapshot>> {
        let doc = self.load().await?;
        let mut rows: Vec<SessionSnapshot> = doc
            .sessions
            .into_iter()
            .filter(|(id, s)| {
                s.platform_id == platform_id
                    && !active_ids.contains(id)
                    && (s.cleaned_at.is_some() || s.state == crate::SessionState::Ended)
            })
            .map(|(_, s)| s)
            .collect();
        rows.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(rows)
    }

    pub async fn get_sticky_post_id(&self, platform_id: &str) -> Result<Option<String>> {
        let doc = self.load().await?;
        Ok(doc.sticky_post_ids.get(platform_id).cloned())
    }

    pub async fn set_sticky_post_id(&self, platform_id: &str, post_id: &str) -> Result<()> {
        let _lock = self.guard.lock().await;
        let mut doc = self.load_locked().await?;
        doc.sticky_post_ids.insert(platform_id.to_string(), post_id.to_string());
        self.write_locked(&doc).await
    }

    pub async fn set_platform_enabled(&self, platform_id: &str, enabled: bool) -> Result<()> {
        let _lock = self.guard.lock().await;
        let mut doc = self.load_locked().await?;
        doc.platform_enabled_state.insert(platform_id.to_string(), enabled);
        self.write_locked(&doc).await
    }

    pub async fn is_platform_enabled(&self, platform_id: &str) -> Result<bool> {
        let doc = self.load().await?;
        Ok(*doc.platform_enabled_state.get(platform_id).unwrap_or(&true))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionState;

    fn sample(session_id: &str, last_activity_at: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            session_id: session_id.to_string(),
            platform_id: "mattermost".to_string(),
            thread_id: "thread-1".to_string(),
            ai_session_uuid: uuid::Uuid::new_v4().to_string(),
            working_dir: "/tmp".to_string(),
            worktree: None,
            state: SessionState::Active,
            created_at: last_activity_at,
            last_activity_at,
            timeout_warning_posted: false,
            session_start_post_id: Some("post-1".to_string()),
            lifecycle_post_id: None,
            resume_fail_count: 0,
            permissions_interactive: false,
            cleaned_at: None,
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions.json"));
        let now = Utc::now();
        store.save("mattermost:thread-1", sample("mattermost:thread-1", now)).await.unwrap();

        let found = store.find_by_thread("mattermost", "thread-1").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().session_start_post_id.as_deref(), Some("post-1"));
    }

    #[tokio::test]
    async fn clean_stale_soft_deletes_old_rows_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions.json"));
        let now = Utc::now();
        store.save("old", sample("old", now - Duration::hours(2))).await.unwrap();
        store.save("fresh", sample("fresh", now)).await.unwrap();

        let affected = store.clean_stale(Duration::hours(1), now).await.unwrap();
        assert_eq!(affected, vec!["old".to_string()]);

        let doc = store.load().await.unwrap();
        assert!(doc.sessions["old"].cleaned_at.is_some());
        assert!(doc.sessions["fresh"].cleaned_at.is_none());
    }

    #[tokio::test]
    async fn clean_history_purges_past_retention() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions.json"));
        let now = Utc::now();
        store.soft_delete_for_test("gone", now - Duration::days(31), &store.load().await.unwrap()).await;
        let purged = store.clean_history(Duration::days(30), now).await.unwrap();
        assert_eq!(purged, vec!["gone".to_string()]);
    }

    impl SessionStore {
        async fn soft_delete_for_test(&self, id: &str, cleaned_at: DateTime<Utc>, _doc: &StoreDocument) {
            let mut snapshot = sample(id, cleaned_at);
            snapshot.cleaned_at = Some(cleaned_at);
            self.save(id, snapshot).await.unwrap();
        }
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions.json"));
        let doc = store.load().await.unwrap();
        assert!(doc.sessions.is_empty());
        assert_eq!(doc.version, super::super::snapshot::STORE_VERSION);
    }
}
