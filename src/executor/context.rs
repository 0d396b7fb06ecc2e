//! Shared context object passed to executors and interactive handlers
//! (REDESIGN FLAGS: pass an explicit context object rather than giving each
//! executor a back-pointer to its owning session).

use crate::platform::PlatformDyn;
use crate::SessionId;
use std::sync::Arc;

/// Everything an executor or interactive handler needs to act on a session,
/// without holding a reference back into the session itself.
#[derive(Clone)]
pub struct ExecutorContext {
    pub session_id: SessionId,
    pub channel: String,
    pub thread_root: Option<String>,
    pub platform: Arc<dyn PlatformDyn>,
}

impl ExecutorContext {
    pub fn new(session_id: SessionId, channel: String, thread_root: Option<String>, platform: Arc<dyn PlatformDyn>) -> Self {
        Self {
            session_id,
            channel,
            thread_root,
            platform,
        }
    }
}
