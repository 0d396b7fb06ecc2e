//! Context-prompt handler (§4.6): offered when a session starts mid-thread
//! with at least two prior non-bot messages, or right after `!cd`/worktree
//! creation. Lets the user choose how much prior thread history to hand the
//! AI as a preamble before the queued prompt.

use crate::platform::PlatformDyn;
use crate::session::types::PendingContextPrompt;
use crate::ThreadMessage;
use chrono::{Duration, Utc};
use std::sync::Arc;

const CANDIDATE_COUNTS: &[usize] = &[3, 5, 10];
const MAX_MESSAGE_CHARS: usize = 500;
const TIMEOUT_SECONDS: i64 = 30;

pub struct ContextPromptHandler {
    channel: String,
    thread_root: String,
}

impl ContextPromptHandler {
    pub fn new(channel: String, thread_root: String) -> Self {
        Self { channel, thread_root }
    }

    /// Whether the prompt should be offered at all for a thread with this
    /// many prior non-bot messages.
    pub fn should_offer(message_count: usize) -> bool {
        message_count >= 2
    }

    fn available_options(message_count: usize) -> Vec<String> {
        let mut options: Vec<String> = CANDIDATE_COUNTS
            .iter()
            .filter(|&&n| n <= message_count)
            .map(|n| n.to_string())
            .collect();
        options.push(format!("All {message_count}"));
        options
    }

    pub async fn prompt(
        &self,
        platform: &Arc<dyn PlatformDyn>,
        queued_prompt: String,
        queued_files: Option<Vec<String>>,
        message_count: usize,
    ) -> crate::Result<PendingContextPrompt> {
        let options = Self::available_options(message_count);
        let mut text = "📜 Include earlier messages from this thread as context?\n".to_string();
        for option in &options {
            text.push_str(&format!("- {option}\n"));
        }
        text.push_str("- Skip (❌)\n");
        let mut reactions: Vec<&str> = vec!["three", "five", "keycap_ten", "100"];
        reactions.push("x");
        let handle = platform
            .create_interactive_post(&self.channel, &text, &reactions, Some(&self.thread_root))
            .await?;
        let now = Utc::now();
        Ok(PendingContextPrompt {
            post_id: handle.id,
            queued_prompt,
            queued_files,
            thread_message_count: message_count,
            created_at: now,
            available_options: options,
            deadline: now + Duration::seconds(TIMEOUT_SECONDS),
        })
    }

    /// Fetch the last `n` non-bot messages and render them as a preamble,
    /// each message truncated so one verbose participant can't blow the
    /// prompt budget.
    pub async fn build_preamble(&self, platform: &Arc<dyn PlatformDyn>, n: usize) -> crate::Result<String> {
        let history = platform.thread_history(&self.thread_root, Some(n), true).await?;
        Ok(Self::render_preamble(&history))
    }

    fn render_preamble(messages: &[ThreadMessage]) -> String {
        let mut text = String::from("[Previous conversation in this thread:]\n");
        for message in messages {
            let truncated: String = message.text.chars().take(MAX_MESSAGE_CHARS).collect();
            text.push_str(&format!("@{}: {}\n", message.username, truncated));
        }
        text
    }

    pub fn is_timed_out(&self, pending: &PendingContextPrompt, now: chrono::DateTime<Utc>) -> bool {
        now >= pending.deadline
    }
}
