//! Per-session wrapper around `ContentExecutor` (§4.5).

use crate::content::{ContentExecutor, FlushOutcome};
use crate::platform::{MessageLimits, PlatformDyn};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shares one `ContentExecutor` behind a lock so both the AI-event stream
/// and command handlers (which may post system asides) can append safely.
pub struct ContentExecutorHandle {
    inner: Mutex<ContentExecutor>,
}

impl ContentExecutorHandle {
    pub fn new(channel: String, thread_root: Option<String>, limits: MessageLimits) -> Self {
        Self {
            inner: Mutex::new(ContentExecutor::new(channel, thread_root, limits)),
        }
    }

    pub async fn append(&self, text: &str) {
        self.inner.lock().await.append(text);
    }

    pub async fn flush(&self, platform: &Arc<dyn PlatformDyn>) -> crate::Result<FlushOutcome> {
        self.inner.lock().await.flush(platform).await
    }

    pub async fn flush_with_reuse(
        &self,
        platform: &Arc<dyn PlatformDyn>,
        reusable_post_id: Option<String>,
    ) -> crate::Result<(FlushOutcome, bool)> {
        self.inner.lock().await.flush_with_reuse(platform, reusable_post_id).await
    }

    pub async fn current_post_id(&self) -> Option<String> {
        self.inner.lock().await.current_post_id().map(str::to_string)
    }
}
