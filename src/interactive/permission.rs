//! Permission-approval state machine (§4.6): triggered when the AI emits a
//! `tool_use` requiring approval, or via the MCP permission-tool callback.

use crate::platform::PlatformDyn;
use crate::session::types::{ApprovalKind, PendingApproval};
use crate::{PostId, ReactionAction};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResolution {
    AllowOnce,
    AllowRule,
    Deny,
}

pub struct PermissionHandler {
    channel: String,
    thread_root: Option<String>,
}

impl PermissionHandler {
    pub fn new(channel: String, thread_root: Option<String>) -> Self {
        Self { channel, thread_root }
    }

    /// Post the approval prompt with its reaction options and return the
    /// pending-state record the session should hold.
    pub async fn prompt(
        &self,
        platform: &Arc<dyn PlatformDyn>,
        tool_use_id: &str,
        kind: ApprovalKind,
        summary: &str,
        deadline: Option<DateTime<Utc>>,
    ) -> crate::Result<PendingApproval> {
        let text = format!("🔐 Approval requested\n{summary}");
        let handle = platform
            .create_interactive_post(&self.channel, &text, &["+1", "white_check_mark", "-1"], self.thread_root.as_deref())
            .await?;
        Ok(PendingApproval {
            post_id: handle.id,
            tool_use_id: tool_use_id.to_string(),
            kind,
            deadline,
        })
    }

    /// Resolve a reaction on the pending post. A `Permission` approval gets
    /// the full three-way resolution (+1 allow once, white_check_mark allow
    /// rule session-wide, -1 deny); `Plan` and `Action` are a plain +1/-1
    /// confirmation with no session-wide rule (§4.6).
    pub fn resolve_reaction(&self, kind: ApprovalKind, emoji_name: &str, action: ReactionAction) -> Option<PermissionResolution> {
        if action != ReactionAction::Added {
            return None;
        }
        match kind {
            ApprovalKind::Permission => match emoji_name {
                "+1" | "thumbsup" => Some(PermissionResolution::AllowOnce),
                "white_check_mark" => Some(PermissionResolution::AllowRule),
                "-1" | "thumbsdown" => Some(PermissionResolution::Deny),
                _ => None,
            },
            ApprovalKind::Plan | ApprovalKind::Action => match emoji_name {
                "+1" | "thumbsup" => Some(PermissionResolution::AllowOnce),
                "-1" | "thumbsdown" => Some(PermissionResolution::Deny),
                _ => None,
            },
        }
    }

    /// Timeout with no configured deadline always resolves to deny, never
    /// leaving the child hanging indefinitely once a deadline *is* set.
    pub fn resolve_timeout(&self) -> PermissionResolution {
        PermissionResolution::Deny
    }

    pub fn post_id_matches(&self, pending: &PendingApproval, post_id: &PostId) -> bool {
        &pending.post_id == post_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbs_up_resolves_to_allow_once() {
        let handler = PermissionHandler::new("ch".into(), None);
        assert_eq!(
            handler.resolve_reaction(ApprovalKind::Permission, "+1", ReactionAction::Added),
            Some(PermissionResolution::AllowOnce)
        );
    }

    #[test]
    fn white_check_mark_resolves_to_allow_rule() {
        let handler = PermissionHandler::new("ch".into(), None);
        assert_eq!(
            handler.resolve_reaction(ApprovalKind::Permission, "white_check_mark", ReactionAction::Added),
            Some(PermissionResolution::AllowRule)
        );
    }

    #[test]
    fn removed_reactions_never_resolve() {
        let handler = PermissionHandler::new("ch".into(), None);
        assert_eq!(handler.resolve_reaction(ApprovalKind::Permission, "+1", ReactionAction::Removed), None);
    }

    #[test]
    fn plan_kind_ignores_white_check_mark() {
        let handler = PermissionHandler::new("ch".into(), None);
        assert_eq!(handler.resolve_reaction(ApprovalKind::Plan, "white_check_mark", ReactionAction::Added), None);
        assert_eq!(
            handler.resolve_reaction(ApprovalKind::Plan, "+1", ReactionAction::Added),
            Some(PermissionResolution::AllowOnce)
        );
        assert_eq!(
            handler.resolve_reaction(ApprovalKind::Plan, "-1", ReactionAction::Added),
            Some(PermissionResolution::Deny)
        );
    }

    #[test]
    fn action_kind_is_plain_allow_deny() {
        let handler = PermissionHandler::new("ch".into(), None);
        assert_eq!(
            handler.resolve_reaction(ApprovalKind::Action, "thumbsup", ReactionAction::Added),
            Some(PermissionResolution::AllowOnce)
        );
        assert_eq!(handler.resolve_reaction(ApprovalKind::Action, "white_check_mark", ReactionAction::Added), None);
    }

    #[test]
    fn timeout_always_denies() {
        let handler = PermissionHandler::new("ch".into(), None);
        assert_eq!(handler.resolve_timeout(), PermissionResolution::Deny);
    }
}
