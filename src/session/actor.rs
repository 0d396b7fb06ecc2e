//! Per-session dispatcher task: two long-lived producers (AI CLI output,
//! inbound platform events) feed a pool of short-lived handler tasks under
//! cooperative cancellation, via a `tokio::select!` event loop that reads
//! the AI's stdout, inbound platform messages, and a command channel in a
//! single owning task.
//!
//! This is the session's one mutation owner: state lives behind
//! `SessionRegistry::with_mut`'s mutex (§4.2's sanctioned alternative to a
//! dedicated owning struct), and this actor is what turns a routed reaction
//! or an external command into the child-process I/O and registry writes
//! that outcome implies — the rest of the crate only ever produces typed
//! intents (`RouteOutcome`, `ExecutorEvent`) for it to apply.

use crate::ai::AiEvent;
use crate::clock::Clock;
use crate::interactive::plan::PLAN_APPROVED_MESSAGE;
use crate::interactive::{PermissionResolution, QuestionHandler};
use crate::message::ExecutorEvent;
use crate::reaction::{ReactionRouter, RouteOutcome};
use crate::session::lifecycle::SessionLifecycle;
use crate::session::registry::SessionRegistry;
use crate::{ReactionEvent, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Inbound work for a session actor: a user message/reaction routed in from
/// the platform, a timer firing, or an explicit command from the text/reaction
/// command parser that already knows which mutation it wants applied.
pub enum SessionInput {
    Inbound(crate::InboundEvent),
    IdleCheck,
    Shutdown,
    /// `!stop` or an X reaction on the session header: kill the child and
    /// soft-delete the session (§4.11).
    Kill,
    /// `!escape` or a pause reaction on the session header: SIGINT the child
    /// without tearing the session down (§4.11).
    Interrupt,
    /// A plain chat message that should go straight to the AI child's stdin,
    /// bypassing the content-executor stream (used to resume a paused child).
    FeedUserMessage(String),
    /// A reaction the router should resolve against this session's pending
    /// state, with the resulting outcome applied here.
    ApplyReaction(ReactionEvent),
}

/// Drives one session's event loop until the AI child's event stream ends or
/// a shutdown/kill signal arrives. Ordering guarantee (§5): AI events are
/// consumed in arrival order and the resulting operations are emitted in
/// order, since this loop and the executor it drives run on a single task.
pub struct SessionActor {
    pub id: SessionId,
    pub ai_events: mpsc::Receiver<AiEvent>,
    pub inbound: mpsc::Receiver<SessionInput>,
    pub operations: mpsc::Sender<ExecutorEvent>,
    pub clock: Arc<dyn Clock>,
    pub idle_check_interval: Duration,
    pub registry: Arc<SessionRegistry>,
    pub lifecycle: Arc<SessionLifecycle>,
    pub router: Arc<ReactionRouter>,
}

impl SessionActor {
    pub async fn run(mut self) {
        tracing::info!(session_id = %self.id, "session actor started");

        loop {
            tokio::select! {
                maybe_event = self.ai_events.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_ai_event(event).await,
                        None => {
                            tracing::info!(session_id = %self.id, "AI event stream ended");
                            break;
                        }
                    }
                }
                maybe_input = self.inbound.recv() => {
                    match maybe_input {
                        Some(SessionInput::Shutdown) | None => {
                            tracing::info!(session_id = %self.id, "session actor shutting down");
                            break;
                        }
                        Some(SessionInput::Inbound(event)) => self.handle_inbound(event).await,
                        Some(SessionInput::IdleCheck) => self.handle_idle_check().await,
                        Some(SessionInput::Kill) => {
                            if let Err(error) = self.lifecycle.kill_session(&self.id, true).await {
                                tracing::warn!(session_id = %self.id, %error, "failed to kill session");
                            }
                            break;
                        }
                        Some(SessionInput::Interrupt) => {
                            if let Err(error) = self.lifecycle.interrupt_session(&self.id).await {
                                tracing::warn!(session_id = %self.id, %error, "failed to interrupt session");
                            }
                        }
                        Some(SessionInput::FeedUserMessage(text)) => self.feed_user_message(&text).await,
                        Some(SessionInput::ApplyReaction(reaction)) => self.handle_reaction(reaction).await,
                    }
                }
                _ = tokio::time::sleep(self.idle_check_interval) => {
                    self.handle_idle_check().await;
                }
            }
        }

        tracing::info!(session_id = %self.id, "session actor stopped");
    }

    async fn handle_ai_event(&self, event: AiEvent) {
        for op in ExecutorEvent::from_ai_event_all(event) {
            if self.operations.send(op).await.is_err() {
                tracing::warn!(session_id = %self.id, "executor channel closed, dropping AI event");
                break;
            }
        }
    }

    async fn handle_inbound(&self, event: crate::InboundEvent) {
        match event {
            crate::InboundEvent::Message(msg) => {
                if self.operations.send(ExecutorEvent::UserMessage(msg)).await.is_err() {
                    tracing::warn!(session_id = %self.id, "executor channel closed, dropping inbound message");
                }
            }
            crate::InboundEvent::Reaction(reaction) => self.handle_reaction(reaction).await,
        }
    }

    async fn handle_idle_check(&self) {
        let _ = self.operations.send(ExecutorEvent::IdleCheck { now: self.clock.now() }).await;
    }

    /// Feed a message straight to the AI child's stdin, used to resume a
    /// paused child rather than going through the content-executor stream.
    async fn feed_user_message(&self, text: &str) {
        if let Some(ai) = self.lifecycle.child_for(&self.id).await {
            if let Err(error) = ai.send_message(text).await {
                tracing::warn!(session_id = %self.id, %error, "failed to feed user message to AI child");
            }
        }
        let _ = self.registry.with_mut(&self.id, |s| s.record_activity(self.clock.now()));
    }

    async fn handle_reaction(&self, reaction: ReactionEvent) {
        match self.router.route(&reaction).await {
            Ok(Some(outcome)) => self.apply_route_outcome(outcome).await,
            Ok(None) => {}
            Err(error) => tracing::warn!(session_id = %self.id, %error, "reaction routing failed"),
        }
    }

    /// Turn a routed reaction's outcome into the child-process I/O or
    /// lifecycle call it implies — the one place in the crate that does so.
    async fn apply_route_outcome(&self, outcome: RouteOutcome) {
        match outcome {
            RouteOutcome::PermissionResolved { tool_use_id, resolution } => {
                self.send_tool_result(&tool_use_id, permission_result_payload(resolution)).await;
            }
            RouteOutcome::QuestionAnswered { tool_use_id, complete, .. } => {
                if complete {
                    let compound = self.registry.find(self.id.platform_id(), self.id.thread_id()).and_then(|s| {
                        s.pending_question_set
                            .as_ref()
                            .map(|pending| QuestionHandler::new(self.id.thread_id().to_string(), None).compound_result(pending))
                    });
                    if let Some(result) = compound {
                        self.send_tool_result(&tool_use_id, result).await;
                    }
                    let _ = self.registry.with_mut(&self.id, |s| s.pending_question_set = None);
                }
            }
            RouteOutcome::PlanApproved => {
                if let Some(ai) = self.lifecycle.child_for(&self.id).await {
                    if let Err(error) = ai.send_message(PLAN_APPROVED_MESSAGE).await {
                        tracing::warn!(session_id = %self.id, %error, "failed to notify child of plan approval");
                    }
                }
            }
            RouteOutcome::PlanDeclined => {
                tracing::info!(session_id = %self.id, "plan declined");
            }
            RouteOutcome::SessionCancelled => {
                if let Err(error) = self.lifecycle.cancel_session(&self.id).await {
                    tracing::warn!(session_id = %self.id, %error, "failed to cancel session");
                }
            }
            RouteOutcome::SessionInterrupted => {
                if let Err(error) = self.lifecycle.interrupt_session(&self.id).await {
                    tracing::warn!(session_id = %self.id, %error, "failed to interrupt session");
                }
            }
            RouteOutcome::SessionResumeRequested => {
                tracing::info!(session_id = %self.id, "resume requested; owned by the session supervisor, not this actor");
            }
            RouteOutcome::ContextPromptResolved { .. }
            | RouteOutcome::WorktreeBranchChosen { .. }
            | RouteOutcome::WorktreeSkipped
            | RouteOutcome::MessageApprovalResolved { .. } => {
                tracing::debug!(session_id = %self.id, "route outcome has no actor-level follow-up yet");
            }
        }
    }

    async fn send_tool_result(&self, tool_use_id: &str, content: serde_json::Value) {
        let Some(ai) = self.lifecycle.child_for(&self.id).await else {
            return;
        };
        if let Err(error) = ai.send_tool_result(tool_use_id, &content).await {
            tracing::warn!(session_id = %self.id, %error, "failed to send tool result to AI child");
        }
    }
}

fn permission_result_payload(resolution: PermissionResolution) -> serde_json::Value {
    match resolution {
        PermissionResolution::AllowOnce | PermissionResolution::AllowRule => serde_json::json!({"behavior": "allow"}),
        PermissionResolution::Deny => serde_json::json!({"behavior": "deny"}),
    }
}
