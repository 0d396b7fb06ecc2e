//! Reaction router (§4.10): for each inbound reaction, resolve the thread
//! it landed on and dispatch it, in priority order, to the first pending
//! state machine willing to consume it. Produces a typed outcome describing
//! what happened; turning that outcome into child-process I/O or further
//! posts is the session actor's job, not the router's.

use crate::interactive::{
    MessageApprovalHandler, MessageApprovalResolution, PermissionHandler, PermissionResolution, PlanHandler,
    QuestionHandler, WorktreePromptHandler,
};
use crate::session::types::{ApprovalKind, PendingWorktreePrompt};
use crate::session::SessionRegistry;
use crate::store::SessionStore;
use crate::{ReactionAction, ReactionEvent};
use std::sync::Arc;

/// Emoji names (platform-normalized) that resume a paused/ended session
/// whose header or lifecycle post still carries one of these reactions.
const RESUME_EMOJI: &[&str] = &["arrows_counterclockwise", "arrow_forward", "repeat"];

#[derive(Debug, Clone)]
pub enum RouteOutcome {
    PermissionResolved { tool_use_id: String, resolution: PermissionResolution },
    QuestionAnswered { tool_use_id: String, option_index: usize, complete: bool },
    ContextPromptResolved { chosen: Option<usize> },
    WorktreeBranchChosen { branch: String },
    WorktreeSkipped,
    MessageApprovalResolved { resolution: MessageApprovalResolution },
    PlanApproved,
    PlanDeclined,
    SessionCancelled,
    SessionInterrupted,
    SessionResumeRequested,
}

pub struct ReactionRouter {
    registry: Arc<SessionRegistry>,
    store: Arc<SessionStore>,
}

impl ReactionRouter {
    pub fn new(registry: Arc<SessionRegistry>, store: Arc<SessionStore>) -> Self {
        Self { registry, store }
    }

    /// Route one reaction event. Returns `None` if nothing consumed it.
    pub async fn route(&self, event: &ReactionEvent) -> crate::Result<Option<RouteOutcome>> {
        let Some(session) = self.registry.find_by_post(&event.post_id) else {
            return self.route_to_paused_session(event).await;
        };

        if event.action != ReactionAction::Added {
            return Ok(None);
        }

        if let Some(pending) = &session.pending_approval {
            if pending.post_id == event.post_id {
                let kind = pending.kind;
                let handler = PermissionHandler::new(session.id.thread_id().to_string(), None);
                if let Some(resolution) = handler.resolve_reaction(kind, &event.emoji_name, event.action) {
                    if kind == ApprovalKind::Plan {
                        let approved = resolution == PermissionResolution::AllowOnce;
                        let plan_handler = PlanHandler::new(session.id.thread_id().to_string(), None);
                        self.registry.with_mut(&session.id, |s| {
                            s.pending_approval = None;
                            if approved {
                                plan_handler.apply(s);
                            }
                        })?;
                        return Ok(Some(if approved { RouteOutcome::PlanApproved } else { RouteOutcome::PlanDeclined }));
                    }
                    let tool_use_id = pending.tool_use_id.clone();
                    self.registry.with_mut(&session.id, |s| s.pending_approval = None)?;
                    return Ok(Some(RouteOutcome::PermissionResolved { tool_use_id, resolution }));
                }
            }
        }

        if let Some(pending) = &session.pending_question_set {
            if pending.current_post_id == event.post_id {
                let handler = QuestionHandler::new(session.id.thread_id().to_string(), None);
                let question = &pending.questions[pending.current_index];
                if let Some(index) = handler.resolve_reaction(question, &event.emoji_name, event.action) {
                    let tool_use_id = pending.tool_use_id.clone();
                    let complete = self.registry.with_mut(&session.id, |s| {
                        let set = s.pending_question_set.as_mut().expect("checked above");
                        handler.answer_current(set, index)
                    })?;
                    return Ok(Some(RouteOutcome::QuestionAnswered { tool_use_id, option_index: index, complete }));
                }
            }
        }

        if let Some(pending) = &session.pending_context_prompt {
            if pending.post_id == event.post_id {
                let chosen = context_prompt_choice(&pending.available_options, &event.emoji_name);
                if chosen.is_some() || event.emoji_name == "x" {
                    self.registry.with_mut(&session.id, |s| s.pending_context_prompt = None)?;
                    return Ok(Some(RouteOutcome::ContextPromptResolved { chosen }));
                }
            }
        }

        if let Some(pending) = &session.pending_worktree_prompt {
            let handler = WorktreePromptHandler::new(session.id.thread_id().to_string(), session.id.thread_id().to_string());
            match pending {
                PendingWorktreePrompt::Initial { post_id, .. } | PendingWorktreePrompt::Failure { post_id, .. }
                    if *post_id == event.post_id && handler.is_skip(&event.emoji_name) =>
                {
                    self.registry.with_mut(&session.id, |s| s.pending_worktree_prompt = None)?;
                    return Ok(Some(RouteOutcome::WorktreeSkipped));
                }
                _ => {}
            }
        }

        if let Some(pending) = &session.pending_message_approval {
            if pending.post_id == event.post_id {
                let handler = MessageApprovalHandler::new(session.id.thread_id().to_string(), None);
                if let Some(resolution) = handler.resolve_reaction(&event.emoji_name, event.action) {
                    self.registry.with_mut(&session.id, |s| s.pending_message_approval = None)?;
                    return Ok(Some(RouteOutcome::MessageApprovalResolved { resolution }));
                }
            }
        }

        if session.pending_bug_report.is_some() {
            // Bug-report confirmation is a simple accept/discard, structurally
            // identical to message approval; reuse its resolver.
            if let Some(pending) = &session.pending_bug_report {
                if pending.post_id == event.post_id {
                    self.registry.with_mut(&session.id, |s| s.pending_bug_report = None)?;
                    return Ok(Some(RouteOutcome::MessageApprovalResolved {
                        resolution: if matches!(event.emoji_name.as_str(), "+1" | "thumbsup") {
                            MessageApprovalResolution::Send
                        } else {
                            MessageApprovalResolution::Discard
                        },
                    }));
                }
            }
        }

        if session.session_start_post_id.as_deref() == Some(event.post_id.as_str()) {
            match event.emoji_name.as_str() {
                "x" | "no_entry_sign" | "octagonal_sign" => return Ok(Some(RouteOutcome::SessionCancelled)),
                "pause_button" | "pause" => return Ok(Some(RouteOutcome::SessionInterrupted)),
                _ => {}
            }
        }

        Ok(None)
    }

    /// No active session owns this post: check whether it's a paused
    /// session's header or lifecycle post and the reaction is a resume
    /// gesture.
    async fn route_to_paused_session(&self, event: &ReactionEvent) -> crate::Result<Option<RouteOutcome>> {
        if event.action != ReactionAction::Added || !RESUME_EMOJI.contains(&event.emoji_name.as_str()) {
            return Ok(None);
        }
        let matches = self.store.find_by_post_id(&event.post_id).await?.is_some();
        Ok(if matches { Some(RouteOutcome::SessionResumeRequested) } else { None })
    }
}

fn context_prompt_choice(available_options: &[String], emoji_name: &str) -> Option<usize> {
    let label = match emoji_name {
        "three" => "3",
        "five" => "5",
        "keycap_ten" => "10",
        "100" => return available_options.iter().position(|o| o.starts_with("All")),
        _ => return None,
    };
    available_options.iter().position(|o| o == label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prompt_choice_maps_keycap_emoji_to_labels() {
        let options = vec!["3".to_string(), "5".to_string(), "All 8".to_string()];
        assert_eq!(context_prompt_choice(&options, "three"), Some(0));
        assert_eq!(context_prompt_choice(&options, "100"), Some(2));
        assert_eq!(context_prompt_choice(&options, "eyes"), None);
    }
}
