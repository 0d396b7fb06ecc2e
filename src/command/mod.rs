//! Command parsing (§4.4): `!cmd [args]` detection in user and AI output,
//! the stackable front-of-message parser, and the AI-output allow-list.

pub mod ai_output;
pub mod parser;
pub mod stackable;
pub mod worktree_cleanup;

pub use parser::{Command, CommandParser};
pub use stackable::StackableCommand;
pub use worktree_cleanup::check_worktree_cleanup;
