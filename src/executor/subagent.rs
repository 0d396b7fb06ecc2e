//! Subagent executor (§4.5): maps each subagent `tool_use_id` to its own
//! post and accumulates its stream in a nested content executor.

use crate::content::ContentExecutor;
use crate::platform::{MessageLimits, PlatformDyn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct SubagentExecutor {
    channel: String,
    thread_root: Option<String>,
    limits: MessageLimits,
    nested: Mutex<HashMap<String, ContentExecutor>>,
}

impl SubagentExecutor {
    pub fn new(channel: String, thread_root: Option<String>, limits: MessageLimits) -> Self {
        Self {
            channel,
            thread_root,
            limits,
            nested: Mutex::new(HashMap::new()),
        }
    }

    pub async fn append(&self, tool_use_id: &str, text: &str) {
        let mut nested = self.nested.lock().await;
        let executor = nested
            .entry(tool_use_id.to_string())
            .or_insert_with(|| ContentExecutor::new(self.channel.clone(), self.thread_root.clone(), self.limits));
        executor.append(text);
    }

    pub async fn flush(&self, tool_use_id: &str, platform: &Arc<dyn PlatformDyn>) -> crate::Result<()> {
        let mut nested = self.nested.lock().await;
        if let Some(executor) = nested.get_mut(tool_use_id) {
            executor.flush(platform).await?;
        }
        Ok(())
    }

    pub async fn finish(&self, tool_use_id: &str) {
        self.nested.lock().await.remove(tool_use_id);
    }
}
