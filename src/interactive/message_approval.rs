//! Message-approval handler (§4.6): a generated reply can be held for
//! explicit operator sign-off before it's sent to the child. `+1` sends it,
//! `-1` discards it.

use crate::platform::PlatformDyn;
use crate::session::types::PendingMessageApproval;
use crate::ReactionAction;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageApprovalResolution {
    Send,
    Discard,
}

pub struct MessageApprovalHandler {
    channel: String,
    thread_root: Option<String>,
}

impl MessageApprovalHandler {
    pub fn new(channel: String, thread_root: Option<String>) -> Self {
        Self { channel, thread_root }
    }

    pub async fn prompt(&self, platform: &Arc<dyn PlatformDyn>, content: String) -> crate::Result<PendingMessageApproval> {
        let text = format!("✉️ Send this message?\n---\n{content}");
        let handle = platform
            .create_interactive_post(&self.channel, &text, &["+1", "-1"], self.thread_root.as_deref())
            .await?;
        Ok(PendingMessageApproval { post_id: handle.id, content })
    }

    pub fn resolve_reaction(&self, emoji_name: &str, action: ReactionAction) -> Option<MessageApprovalResolution> {
        if action != ReactionAction::Added {
            return None;
        }
        match emoji_name {
            "+1" | "thumbsup" => Some(MessageApprovalResolution::Send),
            "-1" | "thumbsdown" => Some(MessageApprovalResolution::Discard),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbs_resolve_send_and_discard() {
        let handler = MessageApprovalHandler::new("ch".into(), None);
        assert_eq!(
            handler.resolve_reaction("+1", ReactionAction::Added),
            Some(MessageApprovalResolution::Send)
        );
        assert_eq!(
            handler.resolve_reaction("-1", ReactionAction::Added),
            Some(MessageApprovalResolution::Discard)
        );
        assert_eq!(handler.resolve_reaction("eyes", ReactionAction::Added), None);
    }
}
