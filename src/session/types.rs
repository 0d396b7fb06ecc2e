//! Per-thread session state (§3).

use crate::{PostId, SessionId, SessionState, WorktreeInfo};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// `{postId, toolUseId, kind}` — at most one per session (§3).
#[derive(Debug, Clone)]
pub struct PendingApproval {
    pub post_id: PostId,
    pub tool_use_id: String,
    pub kind: ApprovalKind,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalKind {
    Permission,
    Plan,
    Action,
}

#[derive(Debug, Clone)]
pub struct QuestionOption {
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Question {
    pub header: String,
    pub prompt: String,
    pub options: Vec<QuestionOption>,
    /// 1-indexed selection, matching the numeric form the compound
    /// tool-result sends back to the child (§8 scenario 3).
    pub answer: Option<usize>,
}

/// `{toolUseId, questions[], currentIndex, currentPostId}` — advances until
/// `currentIndex == questions.len()` (§3).
#[derive(Debug, Clone)]
pub struct PendingQuestionSet {
    pub tool_use_id: String,
    pub questions: Vec<Question>,
    pub current_index: usize,
    pub current_post_id: PostId,
}

impl PendingQuestionSet {
    pub fn is_complete(&self) -> bool {
        self.current_index >= self.questions.len()
    }
}

#[derive(Debug, Clone)]
pub struct PendingContextPrompt {
    pub post_id: PostId,
    pub queued_prompt: String,
    pub queued_files: Option<Vec<String>>,
    pub thread_message_count: usize,
    pub created_at: DateTime<Utc>,
    pub available_options: Vec<String>,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum PendingWorktreePrompt {
    Initial {
        post_id: PostId,
        branch_suggestions: Vec<String>,
        queued_prompt: String,
        queued_files: Option<Vec<String>>,
    },
    Failure {
        post_id: PostId,
        failed_branch: String,
        error_message: String,
        username: String,
    },
}

#[derive(Debug, Clone)]
pub struct PendingMessageApproval {
    pub post_id: PostId,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct PendingBugReport {
    pub post_id: PostId,
    pub title: String,
    pub body: String,
    pub context: String,
}

/// Per-session timer deadlines; the session actor sleeps until the nearest
/// one and re-derives it after handling any event (mirrors the coalesce /
/// retrigger deadline pattern).
#[derive(Debug, Clone, Default)]
pub struct SessionTimers {
    pub idle_check_at: Option<DateTime<Utc>>,
    pub typing_at: Option<DateTime<Utc>>,
    pub statusbar_at: Option<DateTime<Utc>>,
}

/// One conversation thread's full in-memory state.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub ai_session_uuid: uuid::Uuid,
    pub starter_username: String,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub session_number: u64,
    pub working_dir: std::path::PathBuf,
    pub allowed_usernames: HashSet<String>,
    pub permissions_interactive: bool,
    pub session_start_post_id: Option<PostId>,
    pub tasks_post_id: Option<PostId>,
    pub last_task_list_content: String,
    pub tasks_completed: u32,
    pub tasks_minimized: bool,
    pub worktree: Option<WorktreeInfo>,
    pub is_worktree_owner: bool,
    pub state: SessionState,
    pub resume_fail_count: u32,
    pub message_count: u64,
    pub timers: SessionTimers,
    pub current_post_id: Option<PostId>,
    pub current_post_content: String,
    pub pending_content: String,
    pub plan_approved: bool,
    pub timeout_warning_posted: bool,
    pub lifecycle_post_id: Option<PostId>,
    pub last_error: Option<String>,

    pub pending_approval: Option<PendingApproval>,
    pub pending_question_set: Option<PendingQuestionSet>,
    pub pending_context_prompt: Option<PendingContextPrompt>,
    pub pending_worktree_prompt: Option<PendingWorktreePrompt>,
    pub pending_message_approval: Option<PendingMessageApproval>,
    pub pending_bug_report: Option<PendingBugReport>,
}

impl Session {
    pub fn new(
        id: SessionId,
        starter_username: String,
        working_dir: std::path::PathBuf,
        session_number: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            ai_session_uuid: uuid::Uuid::new_v4(),
            starter_username,
            started_at: now,
            last_activity_at: now,
            session_number,
            working_dir,
            allowed_usernames: HashSet::new(),
            permissions_interactive: false,
            session_start_post_id: None,
            tasks_post_id: None,
            last_task_list_content: String::new(),
            tasks_completed: 0,
            tasks_minimized: false,
            worktree: None,
            is_worktree_owner: false,
            state: SessionState::Active,
            resume_fail_count: 0,
            message_count: 0,
            timers: SessionTimers::default(),
            current_post_id: None,
            current_post_content: String::new(),
            pending_content: String::new(),
            plan_approved: false,
            timeout_warning_posted: false,
            lifecycle_post_id: None,
            last_error: None,
            pending_approval: None,
            pending_question_set: None,
            pending_context_prompt: None,
            pending_worktree_prompt: None,
            pending_message_approval: None,
            pending_bug_report: None,
        }
    }

    /// Any user message, tool result, reaction consumed, or outbound post
    /// bumps activity and clears a pending timeout warning (§4.11).
    pub fn record_activity(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
        self.timeout_warning_posted = false;
    }

    pub fn has_any_pending(&self) -> bool {
        self.pending_approval.is_some()
            || self.pending_question_set.is_some()
            || self.pending_context_prompt.is_some()
            || self.pending_worktree_prompt.is_some()
            || self.pending_message_approval.is_some()
            || self.pending_bug_report.is_some()
    }
}
