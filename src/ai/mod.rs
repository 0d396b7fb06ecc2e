//! AI CLI process wrapper: spawns the external coding-assistant executable
//! and converses with it over line-delimited JSON on stdin/stdout.
//!
//! The AI CLI binary itself, and its MCP tool protocol, are out of scope —
//! this module only implements the wrapper's side of the contract (§6).

pub mod process;
pub mod protocol;

pub use process::AiProcess;
pub use protocol::{AiEvent, ResultSubtype};
