//! Sticky channel message: a pinned per-channel summary of bot status and
//! active sessions, refreshed whenever a session starts, ends, or the
//! cleanup scheduler runs (§4.8, §4.11). Per-session headers (the first bot
//! post in each thread, used as the anchor for resume/cancel/interrupt
//! reactions) are posted by `SessionLifecycle::start_session`; this module
//! only owns the channel-level summary.

use crate::platform::PlatformDyn;
use crate::session::SessionRegistry;
use crate::store::SessionStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct StickyMessage {
    registry: Arc<SessionRegistry>,
    store: Arc<SessionStore>,
    /// One sticky post per platform, pinned in whatever channel the bot
    /// operates in there.
    posts: Mutex<HashMap<String, String>>,
}

impl StickyMessage {
    pub fn new(registry: Arc<SessionRegistry>, store: Arc<SessionStore>) -> Self {
        Self { registry, store, posts: Mutex::new(HashMap::new()) }
    }

    fn render(&self, platform: &Arc<dyn PlatformDyn>, platform_id: &str, app_name: &str, app_version: &str) -> String {
        let sessions = self.registry.get_for_platform(platform_id);
        let mut text = format!("**{app_name} v{app_version}** — {} active session(s)\n", sessions.len());
        if sessions.is_empty() {
            text.push_str("_No active sessions._\n");
            return text;
        }
        let formatter = platform.formatter();
        let rows: Vec<Vec<String>> = sessions
            .iter()
            .map(|s| {
                vec![
                    s.id.thread_id().to_string(),
                    s.starter_username.clone(),
                    format!("{:?}", s.state),
                    s.last_activity_at.to_rfc3339(),
                ]
            })
            .collect();
        text.push_str(&formatter.format_table(&["Thread", "Started by", "State", "Last activity"], &rows));
        text
    }

    /// Create or update the sticky post for a platform's channel, pinning it
    /// on first creation.
    pub async fn refresh(
        &self,
        platform: &Arc<dyn PlatformDyn>,
        platform_id: &str,
        channel: &str,
        app_name: &str,
        app_version: &str,
    ) -> crate::Result<()> {
        let text = self.render(platform, platform_id, app_name, app_version);
        let existing = self.posts.lock().await.get(platform_id).cloned();

        let post_id = if let Some(existing) = existing {
            platform.update_post(&existing, &text).await?;
            existing
        } else {
            let handle = platform.create_post(channel, &text, None).await?;
            platform.pin_post(&handle.id).await?;
            handle.id
        };

        self.posts.lock().await.insert(platform_id.to_string(), post_id.clone());
        self.persist_sticky_post_id(platform_id, &post_id).await
    }

    async fn persist_sticky_post_id(&self, platform_id: &str, post_id: &str) -> crate::Result<()> {
        self.store.set_sticky_post_id(platform_id, post_id).await
    }

    /// Recover the pinned post ID after a restart so refresh updates the
    /// existing post rather than creating a new one.
    pub async fn rehydrate(&self, platform_id: &str) -> crate::Result<()> {
        if let Some(post_id) = self.store.get_sticky_post_id(platform_id).await? {
            self.posts.lock().await.insert(platform_id.to_string(), post_id);
        }
        Ok(())
    }
}
