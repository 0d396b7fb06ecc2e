//! Interactive executor (§4.5): hosts the permission-approval and question
//! state machines for one session. The state machines themselves live in
//! [`crate::interactive`]; this type just owns their pending state and
//! wires them to the content breaker's "good enough to flush early" callback.

use crate::content::breaker;
use crate::interactive::permission::PermissionHandler;
use crate::interactive::question::QuestionHandler;

pub struct InteractiveExecutor {
    pub permission: PermissionHandler,
    pub question: QuestionHandler,
}

impl InteractiveExecutor {
    pub fn new(channel: String, thread_root: Option<String>) -> Self {
        Self {
            permission: PermissionHandler::new(channel.clone(), thread_root.clone()),
            question: QuestionHandler::new(channel, thread_root),
        }
    }

    /// Whether streamed text accumulated so far is a good point to flush
    /// early (e.g. before posting an interactive prompt), per the content
    /// breaker's heuristic.
    pub fn good_enough_to_flush_early(&self, pending_text: &str) -> bool {
        breaker::good_enough_to_flush_early(pending_text)
    }
}
