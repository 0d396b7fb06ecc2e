//! Worktree-prompt handler (§4.6): offered before a session starts working
//! in the shared repo, to let the user route it into an isolated git
//! worktree instead. The stackable `!worktree <branch> <remainder>` command
//! bypasses this prompt entirely (handled in `crate::command`).

use crate::platform::PlatformDyn;
use crate::session::types::PendingWorktreePrompt;
use std::sync::Arc;

pub struct WorktreePromptHandler {
    channel: String,
    thread_root: String,
}

impl WorktreePromptHandler {
    pub fn new(channel: String, thread_root: String) -> Self {
        Self { channel, thread_root }
    }

    pub async fn prompt_initial(
        &self,
        platform: &Arc<dyn PlatformDyn>,
        branch_suggestions: Vec<String>,
        queued_prompt: String,
        queued_files: Option<Vec<String>>,
    ) -> crate::Result<PendingWorktreePrompt> {
        let mut text = "🌱 Start this session in an isolated worktree?\n".to_string();
        for (i, suggestion) in branch_suggestions.iter().enumerate() {
            text.push_str(&format!("{}. `{}`\n", i + 1, suggestion));
        }
        text.push_str("- Skip (❌) to work directly in the shared checkout\n");
        text.push_str("- Or reply with a branch name of your own\n");
        let handle = platform
            .create_interactive_post(&self.channel, &text, &["x"], Some(&self.thread_root))
            .await?;
        Ok(PendingWorktreePrompt::Initial {
            post_id: handle.id,
            branch_suggestions,
            queued_prompt,
            queued_files,
        })
    }

    pub async fn prompt_failure(
        &self,
        platform: &Arc<dyn PlatformDyn>,
        failed_branch: String,
        error_message: String,
        username: String,
    ) -> crate::Result<PendingWorktreePrompt> {
        let text = format!(
            "⚠️ Couldn't create a worktree for branch `{failed_branch}`: {error_message}\nReply with another branch name, or react ❌ to work in the shared checkout."
        );
        let handle = platform
            .create_interactive_post(&self.channel, &text, &["x"], Some(&self.thread_root))
            .await?;
        Ok(PendingWorktreePrompt::Failure {
            post_id: handle.id,
            failed_branch,
            error_message,
            username,
        })
    }

    /// Resolve a reply against an initial prompt: a number selects a
    /// suggestion, anything else non-empty is a free-form branch name.
    pub fn resolve_initial_reply<'a>(&self, suggestions: &'a [String], text: &str) -> Option<&'a str> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(n) = trimmed.parse::<usize>() {
            return suggestions.get(n.checked_sub(1)?).map(String::as_str);
        }
        None
    }

    pub fn is_skip(&self, emoji_name: &str) -> bool {
        emoji_name == "x" || emoji_name == "no_entry_sign"
    }
}
