//! The executor set (§4.5): content, task-list, interactive, subagent, and
//! system executors, each owning its own slice of per-session state.

pub mod content;
pub mod context;
pub mod interactive;
pub mod subagent;
pub mod system;
pub mod tasklist;

pub use content::ContentExecutorHandle;
pub use context::ExecutorContext;
pub use interactive::InteractiveExecutor;
pub use subagent::SubagentExecutor;
pub use tasklist::TaskListExecutor;
