//! Stream transformation and dispatch from AI CLI events to platform
//! operations (§4.5).

pub mod manager;
pub mod operation;

pub use manager::{ManagerEvent, MessageManager};
pub use operation::{ApprovalRequest, ExecutorEvent, LifecycleEvent, QuestionRequest};
