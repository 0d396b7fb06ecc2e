//! Plan-approval handler (§4.6): a `+1` on the plan post sets `planApproved`,
//! clears any questions left over from plan mode, and tells the child to
//! proceed. Other pending approvals are left untouched — approving a plan
//! never resolves an unrelated permission prompt.

use crate::platform::PlatformDyn;
use crate::session::types::{ApprovalKind, PendingApproval, Session};
use crate::ReactionAction;
use std::sync::Arc;

pub const PLAN_APPROVED_MESSAGE: &str = "Plan approved! Please proceed with the implementation.";

pub struct PlanHandler {
    channel: String,
    thread_root: Option<String>,
}

impl PlanHandler {
    pub fn new(channel: String, thread_root: Option<String>) -> Self {
        Self { channel, thread_root }
    }

    /// Post the plan and register the pending approval it's waiting on.
    /// The plan is its own post, distinct from the session header (§4.6).
    pub async fn prompt(&self, platform: &Arc<dyn PlatformDyn>, plan_text: &str) -> crate::Result<PendingApproval> {
        let text = format!("📋 Plan\n{plan_text}");
        let handle = platform
            .create_interactive_post(&self.channel, &text, &["+1", "-1"], self.thread_root.as_deref())
            .await?;
        Ok(PendingApproval {
            post_id: handle.id,
            tool_use_id: String::new(),
            kind: ApprovalKind::Plan,
            deadline: None,
        })
    }

    /// Whether this reaction on this post approves the plan.
    pub fn is_approval(&self, pending_post_id: &str, post_id: &str, emoji_name: &str, action: ReactionAction) -> bool {
        action == ReactionAction::Added && post_id == pending_post_id && matches!(emoji_name, "+1" | "thumbsup")
    }

    /// Apply the approval to session state: mark the plan approved and drop
    /// any stale question-set left over from plan mode, since those
    /// questions no longer apply once the plan itself has been accepted.
    /// Any in-flight permission approval is left untouched — a plan
    /// approval never resolves an unrelated permission prompt.
    pub fn apply(&self, session: &mut Session) {
        session.plan_approved = true;
        session.pending_question_set = None;
    }

    pub async fn notify_child(&self, platform: &Arc<dyn PlatformDyn>) -> crate::Result<()> {
        platform.create_post(&self.channel, PLAN_APPROVED_MESSAGE, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionId;
    use chrono::Utc;

    fn sample_session() -> Session {
        Session::new(SessionId::new("mm", "t1"), "alice".into(), "/tmp".into(), 1, Utc::now())
    }

    #[test]
    fn thumbs_up_on_the_right_post_approves() {
        let handler = PlanHandler::new("ch".into(), None);
        assert!(handler.is_approval("p1", "p1", "+1", ReactionAction::Added));
        assert!(!handler.is_approval("p1", "p2", "+1", ReactionAction::Added));
        assert!(!handler.is_approval("p1", "p1", "-1", ReactionAction::Added));
    }

    #[test]
    fn apply_sets_plan_approved_and_clears_stale_questions() {
        let handler = PlanHandler::new("ch".into(), None);
        let mut session = sample_session();
        session.pending_question_set = Some(crate::session::types::PendingQuestionSet {
            tool_use_id: "t".into(),
            questions: vec![],
            current_index: 0,
            current_post_id: "p1".into(),
        });
        handler.apply(&mut session);
        assert!(session.plan_approved);
        assert!(session.pending_question_set.is_none());
    }
}
