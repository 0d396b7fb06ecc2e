//! Central pending-state holder: dispatches `ExecutorEvent`s to the
//! executor that owns each piece of sub-state, and emits completion events
//! back to the session actor (§4.5).

use super::operation::{ExecutorEvent, LifecycleEvent};
use crate::executor::content::ContentExecutorHandle;
use crate::executor::system;
use crate::executor::tasklist::TaskListExecutor;
use crate::interactive::{PermissionHandler, PlanHandler, QuestionHandler};
use crate::platform::PlatformDyn;
use crate::session::registry::SessionRegistry;
use crate::session::types::ApprovalKind;
use crate::SessionId;
use std::sync::Arc;

/// A completion signal the message manager emits after routing an event, so
/// the session actor can react (e.g. tear down on a terminal result).
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    Flushed,
    SessionFinished { ok: bool },
    NeedsApproval { tool_use_id: String },
    NeedsAnswer { tool_use_id: String },
}

pub struct MessageManager {
    session_id: SessionId,
    registry: Arc<SessionRegistry>,
    platform: Arc<dyn PlatformDyn>,
    content: ContentExecutorHandle,
    tasks: TaskListExecutor,
}

impl MessageManager {
    pub fn new(
        session_id: SessionId,
        registry: Arc<SessionRegistry>,
        platform: Arc<dyn PlatformDyn>,
        content: ContentExecutorHandle,
        tasks: TaskListExecutor,
    ) -> Self {
        Self {
            session_id,
            registry,
            platform,
            content,
            tasks,
        }
    }

    pub async fn dispatch(&mut self, event: ExecutorEvent) -> crate::Result<Option<ManagerEvent>> {
        match event {
            ExecutorEvent::AppendContent { text } => {
                self.content.append(&text).await;
                Ok(None)
            }
            ExecutorEvent::Flush => {
                let reusable = self.tasks.take_post_id_for_reuse().await;
                let (_, reused) = self.content.flush_with_reuse(&self.platform, reusable.clone()).await?;
                if reused {
                    self.tasks.bump_to_bottom(&self.platform).await?;
                } else if let Some(id) = reusable {
                    self.tasks.restore_post_id(id).await;
                }
                Ok(Some(ManagerEvent::Flushed))
            }
            ExecutorEvent::TaskList { tasks } => {
                self.tasks.update(&self.platform, tasks).await?;
                Ok(None)
            }
            ExecutorEvent::Question(req) => {
                let channel = self.channel_id();
                let handler = QuestionHandler::new(channel, None);
                let pending = handler.prompt(&self.platform, req.tool_use_id.clone(), &req.questions).await?;
                self.registry.register_post(pending.current_post_id.clone(), self.session_id.thread_id().to_string());
                self.registry
                    .with_mut(&self.session_id, |s| s.pending_question_set = Some(pending))?;
                Ok(Some(ManagerEvent::NeedsAnswer { tool_use_id: req.tool_use_id }))
            }
            ExecutorEvent::Approval(req) => {
                let channel = self.channel_id();
                let handler = PermissionHandler::new(channel, None);
                let summary = format!("{} {}", req.tool_name, req.input);
                let pending = handler
                    .prompt(&self.platform, &req.tool_use_id, ApprovalKind::Permission, &summary, None)
                    .await?;
                self.registry.register_post(pending.post_id.clone(), self.session_id.thread_id().to_string());
                self.registry.with_mut(&self.session_id, |s| s.pending_approval = Some(pending))?;
                Ok(Some(ManagerEvent::NeedsApproval { tool_use_id: req.tool_use_id }))
            }
            ExecutorEvent::Plan { text } => {
                let channel = self.channel_id();
                let handler = PlanHandler::new(channel, None);
                let pending = handler.prompt(&self.platform, &text).await?;
                self.registry.register_post(pending.post_id.clone(), self.session_id.thread_id().to_string());
                self.registry.with_mut(&self.session_id, |s| s.pending_approval = Some(pending))?;
                Ok(None)
            }
            ExecutorEvent::SystemMessage { text } => {
                system::post_system_message(&self.platform, &self.channel_id(), &text).await?;
                Ok(None)
            }
            ExecutorEvent::Subagent { tool_use_id, text } => {
                tracing::debug!(session_id = %self.session_id, tool_use_id, %text, "subagent activity");
                Ok(None)
            }
            ExecutorEvent::StatusUpdate { .. } => Ok(None),
            ExecutorEvent::Lifecycle(LifecycleEvent::ResultSuccess { .. }) => {
                self.content.flush(&self.platform).await?;
                Ok(Some(ManagerEvent::SessionFinished { ok: true }))
            }
            ExecutorEvent::Lifecycle(LifecycleEvent::ResultError { .. }) => {
                self.content.flush(&self.platform).await?;
                Ok(Some(ManagerEvent::SessionFinished { ok: false }))
            }
            ExecutorEvent::Lifecycle(LifecycleEvent::PermanentFailure { reason }) => {
                system::post_error_message(&self.platform, &self.channel_id(), &reason).await?;
                Ok(Some(ManagerEvent::SessionFinished { ok: false }))
            }
            ExecutorEvent::UserMessage(_) | ExecutorEvent::Reaction(_) | ExecutorEvent::IdleCheck { .. } => {
                // Routed by the reaction router / command parser upstream of
                // the message manager; nothing to do here.
                Ok(None)
            }
        }
    }

    fn channel_id(&self) -> String {
        self.registry
            .find(self.session_id.platform_id(), self.session_id.thread_id())
            .map(|s| s.id.thread_id().to_string())
            .unwrap_or_default()
    }
}
