//! Persisted session store document shapes and forward migrations (§3, §4.3).

use crate::{SessionState, WorktreeInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const STORE_VERSION: u32 = 2;

/// A single session's persisted snapshot. Every field that survives a
/// process restart lives here; transient state (child process handle,
/// in-memory channels) never does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub platform_id: String,
    pub thread_id: String,
    pub ai_session_uuid: String,
    pub working_dir: String,
    #[serde(default)]
    pub worktree: Option<WorktreeInfo>,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(default)]
    pub timeout_warning_posted: bool,
    #[serde(default)]
    pub session_start_post_id: Option<String>,
    /// Renamed from the legacy `timeoutPostId` field during v1→v2 migration.
    #[serde(default, alias = "timeoutPostId")]
    pub lifecycle_post_id: Option<String>,
    #[serde(default)]
    pub resume_fail_count: u32,
    #[serde(default)]
    pub permissions_interactive: bool,
    #[serde(default)]
    pub cleaned_at: Option<DateTime<Utc>>,
}

/// The full file-backed document (§6 persistent state file layout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub sessions: HashMap<String, SessionSnapshot>,
    #[serde(default)]
    pub sticky_post_ids: HashMap<String, String>,
    #[serde(default)]
    pub platform_enabled_state: HashMap<String, bool>,
}

fn default_version() -> u32 {
    1
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            sessions: HashMap::new(),
            sticky_post_ids: HashMap::new(),
            platform_enabled_state: HashMap::new(),
        }
    }
}

impl StoreDocument {
    /// Apply forward migrations in place. Returns true if anything changed,
    /// so the caller knows to rewrite the file.
    pub fn migrate(&mut self) -> bool {
        let mut changed = false;
        if self.version < 2 {
            // v1 kept sessions keyed by bare threadId; v2 uses the composite
            // `platformId:threadId` key. Any row whose key lacks a `:` is a
            // v1 survivor and gets re-keyed using its own platform_id field.
            let legacy: Vec<String> = self
                .sessions
                .keys()
                .filter(|k| !k.contains(':'))
                .cloned()
                .collect();
            for old_key in legacy {
                if let Some(snapshot) = self.sessions.remove(&old_key) {
                    let new_key = format!("{}:{}", snapshot.platform_id, snapshot.thread_id);
                    self.sessions.insert(new_key, snapshot);
                    changed = true;
                }
            }
            self.version = 2;
            changed = true;
        }
        changed
    }
}
