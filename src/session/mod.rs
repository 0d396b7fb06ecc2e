//! Per-thread session state and lifecycle (§3, §4.2, §4.11).

pub mod actor;
pub mod lifecycle;
pub mod registry;
pub mod types;

pub use actor::{SessionActor, SessionInput};
pub use lifecycle::SessionLifecycle;
pub use registry::SessionRegistry;
pub use types::{
    ApprovalKind, PendingApproval, PendingBugReport, PendingContextPrompt, PendingMessageApproval,
    PendingQuestionSet, PendingWorktreePrompt, Question, QuestionOption, Session, SessionTimers,
};
