//! threadbridge: bridges a chat platform to a long-lived AI CLI session per thread.
//!
//! Every conversation thread gets its own AI child process, its own pending
//! interactive state, and its own entry in the on-disk session store. The
//! platform transport, the AI CLI binary itself, and the TUI/CLI surface are
//! external collaborators whose contracts this crate consumes — see `platform`
//! and `ai`.

pub mod ai;
pub mod cleanup;
pub mod clock;
pub mod command;
pub mod config;
pub mod content;
pub mod error;
pub mod executor;
pub mod interactive;
pub mod message;
pub mod platform;
pub mod process;
pub mod reaction;
pub mod session;
pub mod sticky;
pub mod store;
pub mod update;
pub mod worktree;

pub use error::{Error, Result};

use serde::{Deserialize, Serialize};

/// Identifier for a configured platform connection (e.g. "mattermost", "slack").
pub type PlatformId = String;

/// Identifier for a chat thread root post, as assigned by the platform.
pub type ThreadId = String;

/// Identifier for an individual post on the platform.
pub type PostId = String;

/// Composite key identifying one session: `"platformId:threadId"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(platform_id: &str, thread_id: &str) -> Self {
        Self(format!("{platform_id}:{thread_id}"))
    }

    /// Thread IDs never contain `:` on any supported platform, so the first
    /// colon is always the separator between platform and thread.
    pub fn parts(&self) -> Option<(&str, &str)> {
        self.0.split_once(':')
    }

    pub fn platform_id(&self) -> &str {
        self.parts().map(|(p, _)| p).unwrap_or(&self.0)
    }

    pub fn thread_id(&self) -> &str {
        self.parts().map(|(_, t)| t).unwrap_or("")
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tagged content block, as emitted by the AI CLI or rendered into a platform post.
///
/// Unknown block kinds encountered on the wire are logged and dropped rather
/// than treated as fatal, since the AI CLI's event schema can grow new kinds
/// independently of this crate's release cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: serde_json::Value },
    ToolResult { tool_use_id: String, content: serde_json::Value },
    Thinking { text: String },
    Control { kind: String, payload: serde_json::Value },
}

/// One entry in a session's running task list, mirrored from the AI CLI's
/// `TodoWrite` tool calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub content: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

/// Lifecycle state of a session. See `session::types::Session` for the full
/// state machine and the transitions that drive it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Cancelling,
    Interrupted,
    TimingOut,
    Paused,
    Ended,
}

/// Worktree binding for a session using git worktree isolation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorktreeInfo {
    pub repo_root: std::path::PathBuf,
    pub worktree_path: std::path::PathBuf,
    pub branch: String,
}

/// Reaction add/remove event coming from the platform's inbound stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub post_id: PostId,
    pub user_id: String,
    pub emoji_name: String,
    pub action: ReactionAction,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReactionAction {
    Added,
    Removed,
}

/// An inbound chat message, normalized from whichever platform produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub post_id: PostId,
    pub thread_id: ThreadId,
    pub channel_id: String,
    pub user_id: String,
    pub username: String,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub is_bot: bool,
}

/// A historical message as returned by `Platform::thread_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub post_id: PostId,
    pub username: String,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub is_bot: bool,
}

/// Inbound events a platform adapter pushes onto its stream.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(InboundMessage),
    Reaction(ReactionEvent),
}
