//! High-level operations the stream transformer emits (§4.5): the stateless
//! bridge between raw AI CLI events/inbound platform events and the
//! executors that own their own sub-state.

use crate::ai::AiEvent;
use crate::{ContentBlock, InboundMessage, ReactionEvent, Task};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub tool_use_id: String,
    pub tool_name: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct QuestionRequest {
    pub tool_use_id: String,
    pub questions: serde_json::Value,
}

#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    ResultSuccess {
        total_cost_usd: Option<f64>,
        duration_ms: Option<u64>,
    },
    ResultError {
        subtype: String,
    },
    PermanentFailure {
        reason: String,
    },
}

/// The ordered sequence of high-level operations a stateless transformer
/// derives from the AI CLI's stream and from inbound platform events.
#[derive(Debug, Clone)]
pub enum ExecutorEvent {
    AppendContent { text: String },
    Flush,
    TaskList { tasks: Vec<Task> },
    Question(QuestionRequest),
    Approval(ApprovalRequest),
    Plan { text: String },
    SystemMessage { text: String },
    Subagent { tool_use_id: String, text: String },
    StatusUpdate { model: Option<String>, total_cost_usd: Option<f64> },
    Lifecycle(LifecycleEvent),
    UserMessage(InboundMessage),
    Reaction(ReactionEvent),
    IdleCheck { now: DateTime<Utc> },
}

impl ExecutorEvent {
    /// Translate one raw AI CLI event into zero-or-more high-level
    /// operations. Only the first is returned here; callers that need the
    /// full fan-out (e.g. an assistant message with several content blocks)
    /// should use [`ExecutorEvent::from_ai_event_all`].
    pub fn from_ai_event(event: AiEvent) -> Self {
        Self::from_ai_event_all(event).into_iter().next().unwrap_or(Self::Flush)
    }

    pub fn from_ai_event_all(event: AiEvent) -> Vec<Self> {
        match event {
            AiEvent::System(_) => vec![],
            AiEvent::Assistant { message } | AiEvent::User { message } => {
                message.content.into_iter().filter_map(block_to_operation).collect()
            }
            AiEvent::Result {
                subtype,
                is_error,
                total_cost_usd,
                duration_ms,
                ..
            } => {
                let lifecycle = if is_error {
                    LifecycleEvent::ResultError {
                        subtype: format!("{subtype:?}"),
                    }
                } else {
                    LifecycleEvent::ResultSuccess {
                        total_cost_usd,
                        duration_ms,
                    }
                };
                vec![Self::Flush, Self::Lifecycle(lifecycle)]
            }
        }
    }
}

fn block_to_operation(block: ContentBlock) -> Option<ExecutorEvent> {
    match block {
        ContentBlock::Text { text } => Some(ExecutorEvent::AppendContent { text }),
        ContentBlock::ToolUse { name, input, .. } if name == "TodoWrite" => {
            Some(ExecutorEvent::TaskList { tasks: parse_task_list(&input) })
        }
        ContentBlock::ToolUse { id, name, input } if name == "AskUserQuestion" => {
            Some(ExecutorEvent::Question(QuestionRequest {
                tool_use_id: id,
                questions: input,
            }))
        }
        ContentBlock::ToolUse { id, name, input } => Some(ExecutorEvent::Approval(ApprovalRequest {
            tool_use_id: id,
            tool_name: name,
            input,
        })),
        ContentBlock::ToolResult { .. } => None,
        ContentBlock::Thinking { .. } => None,
        ContentBlock::Control { kind, payload } if kind == "plan_mode" => Some(ExecutorEvent::Plan {
            text: payload.get("plan").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        }),
        ContentBlock::Control { .. } => None,
    }
}

fn parse_task_list(input: &serde_json::Value) -> Vec<Task> {
    let Some(items) = input.get("todos").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let content = item
                .get("content")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let status = match item.get("status").and_then(|v| v.as_str()) {
                Some("in_progress") => crate::TaskStatus::InProgress,
                Some("completed") => crate::TaskStatus::Completed,
                _ => crate::TaskStatus::Pending,
            };
            Task {
                id: item
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| idx.to_string()),
                content,
                status,
            }
        })
        .collect()
}
