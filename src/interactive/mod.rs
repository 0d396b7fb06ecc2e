//! Interactive state machines (§4.6): each handler posts a prompt with
//! reaction options, the reaction router (`crate::reaction`) dispatches the
//! resulting reaction or reply back to it, and the handler resolves the
//! pending state and clears it.

pub mod context_prompt;
pub mod message_approval;
pub mod permission;
pub mod plan;
pub mod question;
pub mod worktree_prompt;

pub use context_prompt::ContextPromptHandler;
pub use message_approval::{MessageApprovalHandler, MessageApprovalResolution};
pub use permission::{PermissionHandler, PermissionResolution};
pub use plan::PlanHandler;
pub use question::QuestionHandler;
pub use worktree_prompt::WorktreePromptHandler;
