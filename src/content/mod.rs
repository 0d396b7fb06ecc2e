//! The content executor (§4.5): accumulates streamed text and flushes it to
//! platform posts, splitting at logical breakpoints when content grows past
//! the platform's length limits.

pub mod breaker;
pub mod format;

use crate::platform::{MessageLimits, PlatformDyn, PostHandle};
use std::sync::Arc;

/// Outcome of a flush, so callers (the task-list executor, tests) can react.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The existing post was updated in place.
    Updated,
    /// A new post was created because the old one no longer exists or the
    /// combined content no longer fits.
    Created,
    /// There was nothing pending to flush.
    Empty,
}

/// Per-session content accumulator and post-update pipeline.
///
/// Owns `current_post_id`/`current_post_content`/`pending_content` exactly
/// as described in §4.5 and enforces invariant 3 (after a successful flush,
/// `current_post_content` equals the last content known to be visible) and
/// invariant 4 (`pending_content` never re-contains already-flushed bytes).
pub struct ContentExecutor {
    channel: String,
    thread_root: Option<String>,
    current_post_id: Option<String>,
    current_post_content: String,
    pending_content: String,
    limits: MessageLimits,
}

impl ContentExecutor {
    pub fn new(channel: String, thread_root: Option<String>, limits: MessageLimits) -> Self {
        Self {
            channel,
            thread_root,
            current_post_id: None,
            current_post_content: String::new(),
            pending_content: String::new(),
            limits,
        }
    }

    pub fn current_post_id(&self) -> Option<&str> {
        self.current_post_id.as_deref()
    }

    /// Accumulate streamed text. Does not touch the platform.
    pub fn append(&mut self, text: &str) {
        self.pending_content.push_str(text);
    }

    /// Push accumulated content to a platform post, splitting at a logical
    /// breakpoint (and creating as many continuation posts as needed) until
    /// what remains fits the platform's limits.
    pub async fn flush(&mut self, platform: &Arc<dyn PlatformDyn>) -> crate::Result<FlushOutcome> {
        let (outcome, _reused) = self.flush_with_reuse(platform, None).await?;
        Ok(outcome)
    }

    /// Same as [`Self::flush`], but the first overflow split reuses
    /// `reusable_post_id` (the old task-list post, when the caller has one
    /// to spare) via an update instead of creating a brand new post. Returns
    /// whether that id was actually consumed, so the caller knows whether it
    /// still owns the id (and must give it back) or the content executor
    /// took it over.
    pub async fn flush_with_reuse(
        &mut self,
        platform: &Arc<dyn PlatformDyn>,
        mut reusable_post_id: Option<String>,
    ) -> crate::Result<(FlushOutcome, bool)> {
        if self.pending_content.is_empty() {
            return Ok((FlushOutcome::Empty, false));
        }

        let mut combined = std::mem::take(&mut self.current_post_content);
        combined.push_str(&self.pending_content);
        self.pending_content.clear();

        let mut outcome = FlushOutcome::Empty;
        let mut reused = false;
        loop {
            if combined.len() <= self.limits.max_length && combined.len() <= self.limits.hard_threshold {
                outcome = self.post_whole(platform, combined).await?;
                break;
            }

            // Over the hard per-post cap or the soft height threshold: split
            // off a post's worth at a clean breakpoint and keep going with
            // whatever remains — the previous post is sealed and no longer
            // tracked as `current_post_id`.
            let limit = if combined.len() > self.limits.max_length {
                self.limits.max_length
            } else {
                self.limits.hard_threshold
            };
            let break_at = breaker::last_breakpoint_before(&combined, limit)
                .map(|bp| bp.index)
                .unwrap_or_else(|| limit.min(combined.len()))
                .max(1);
            let tail = combined.split_off(break_at);
            self.current_post_id = None;
            let handle = if let Some(id) = reusable_post_id.take() {
                platform.update_post(&id, &combined).await?;
                reused = true;
                PostHandle { id, created_at: chrono::Utc::now() }
            } else {
                platform
                    .create_post(&self.channel, &combined, self.thread_root.as_deref())
                    .await?
            };
            self.current_post_id = Some(handle.id);
            self.current_post_content = combined;
            outcome = FlushOutcome::Created;
            combined = tail;
            if combined.is_empty() {
                break;
            }
        }

        Ok((outcome, reused))
    }

    async fn post_whole(
        &mut self,
        platform: &Arc<dyn PlatformDyn>,
        combined: String,
    ) -> crate::Result<FlushOutcome> {
        let outcome = match self.current_post_id.clone() {
            Some(id) => match platform.update_post(&id, &combined).await {
                Ok(()) => FlushOutcome::Updated,
                Err(_) => {
                    // On update error, never lose content: null the post and
                    // retry as a new post on the next flush.
                    self.current_post_id = None;
                    self.pending_content = combined;
                    self.current_post_content.clear();
                    return Ok(FlushOutcome::Empty);
                }
            },
            None => {
                let handle = platform
                    .create_post(&self.channel, &combined, self.thread_root.as_deref())
                    .await?;
                self.current_post_id = Some(handle.id);
                FlushOutcome::Created
            }
        };
        self.current_post_content = combined;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::format::MattermostFormatter;
    use crate::platform::{Platform, PostHandle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakePlatform {
        limits: MessageLimits,
        posts: Mutex<Vec<(String, String)>>,
        next_id: AtomicUsize,
        formatter: MattermostFormatter,
        fail_next_update: std::sync::atomic::AtomicBool,
    }

    impl FakePlatform {
        fn new(max_length: usize) -> Self {
            Self {
                limits: MessageLimits {
                    max_length,
                    hard_threshold: max_length,
                },
                posts: Mutex::new(Vec::new()),
                next_id: AtomicUsize::new(1),
                formatter: MattermostFormatter,
                fail_next_update: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    impl Platform for FakePlatform {
        fn name(&self) -> &str {
            "fake"
        }

        async fn connect(&self) -> crate::Result<crate::platform::traits::InboundStream> {
            unreachable!("not exercised in content executor tests")
        }

        async fn create_post(
            &self,
            _channel: &str,
            text: &str,
            _thread_root: Option<&str>,
        ) -> crate::Result<PostHandle> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
            self.posts.lock().unwrap().push((id.clone(), text.to_string()));
            Ok(PostHandle {
                id,
                created_at: chrono::Utc::now(),
            })
        }

        async fn update_post(&self, id: &str, text: &str) -> crate::Result<()> {
            if self.fail_next_update.swap(false, Ordering::SeqCst) {
                return Err(crate::error::PlatformError::Request("boom".into()).into());
            }
            let mut posts = self.posts.lock().unwrap();
            if let Some(entry) = posts.iter_mut().find(|(pid, _)| pid == id) {
                entry.1 = text.to_string();
            }
            Ok(())
        }

        async fn delete_post(&self, _id: &str) -> crate::Result<()> {
            Ok(())
        }

        async fn create_interactive_post(
            &self,
            channel: &str,
            text: &str,
            _reactions: &[&str],
            thread_root: Option<&str>,
        ) -> crate::Result<PostHandle> {
            Platform::create_post(self, channel, text, thread_root).await
        }

        async fn add_reaction(&self, _id: &str, _emoji: &str) -> crate::Result<()> {
            Ok(())
        }
        async fn remove_reaction(&self, _id: &str, _emoji: &str) -> crate::Result<()> {
            Ok(())
        }

        async fn thread_history(
            &self,
            _thread_root: &str,
            _limit: Option<usize>,
            _exclude_bot_messages: bool,
        ) -> crate::Result<Vec<crate::ThreadMessage>> {
            Ok(Vec::new())
        }

        async fn pin_post(&self, _id: &str) -> crate::Result<()> {
            Ok(())
        }
        async fn unpin_post(&self, _id: &str) -> crate::Result<()> {
            Ok(())
        }
        async fn pinned_posts(&self, _channel: &str) -> crate::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn bot_user(&self) -> crate::Result<String> {
            Ok("bot".into())
        }
        async fn user_by_username(&self, _name: &str) -> crate::Result<Option<String>> {
            Ok(None)
        }
        fn is_user_allowed(&self, _name: &str) -> bool {
            true
        }
        fn is_bot_mentioned(&self, _text: &str) -> bool {
            false
        }
        fn extract_prompt(&self, text: &str) -> String {
            text.to_string()
        }
        fn formatter(&self) -> &dyn format::Formatter {
            &self.formatter
        }
        fn message_limits(&self) -> MessageLimits {
            self.limits
        }
    }

    fn dyn_platform(max_length: usize) -> Arc<dyn PlatformDyn> {
        Arc::new(FakePlatform::new(max_length))
    }

    fn fake_platform(max_length: usize) -> (Arc<FakePlatform>, Arc<dyn PlatformDyn>) {
        let fake = Arc::new(FakePlatform::new(max_length));
        let dynp: Arc<dyn PlatformDyn> = fake.clone();
        (fake, dynp)
    }

    #[tokio::test]
    async fn content_exactly_at_max_length_is_a_single_post() {
        let platform = dyn_platform(10);
        let mut exec = ContentExecutor::new(
            "ch".into(),
            None,
            MessageLimits {
                max_length: 10,
                hard_threshold: 10,
            },
        );
        exec.append(&"a".repeat(10));
        let outcome = exec.flush(&platform).await.unwrap();
        assert_eq!(outcome, FlushOutcome::Created);
        assert_eq!(exec.current_post_content.len(), 10);
    }

    #[tokio::test]
    async fn content_over_max_length_splits_into_two_posts() {
        let (fake, platform) = fake_platform(10);
        let mut exec = ContentExecutor::new(
            "ch".into(),
            None,
            MessageLimits {
                max_length: 10,
                hard_threshold: 10,
            },
        );
        exec.append(&"a".repeat(11));
        let outcome = exec.flush(&platform).await.unwrap();
        assert_eq!(outcome, FlushOutcome::Created);
        assert!(exec.pending_content.is_empty());
        assert_eq!(fake.posts.lock().unwrap().len(), 2, "11 chars over a 10-char cap needs two posts");
    }

    #[tokio::test]
    async fn update_error_nulls_current_post_and_preserves_pending_content() {
        let fake = Arc::new(FakePlatform::new(1000));
        let dyn_platform: Arc<dyn PlatformDyn> = fake.clone();
        let mut exec = ContentExecutor::new(
            "ch".into(),
            None,
            MessageLimits {
                max_length: 1000,
                hard_threshold: 1000,
            },
        );
        exec.append("first");
        exec.flush(&dyn_platform).await.unwrap();
        assert!(exec.current_post_id.is_some());

        fake.fail_next_update.store(true, Ordering::SeqCst);
        exec.append(" second");
        let outcome = exec.flush(&dyn_platform).await.unwrap();
        assert_eq!(outcome, FlushOutcome::Empty);
        assert!(exec.current_post_id.is_none());
        // Content is never lost: it stays queued for the next flush.
        assert!(exec.pending_content.contains("first"));
        assert!(exec.pending_content.contains("second"));
    }

    #[tokio::test]
    async fn overflow_reuses_the_given_post_id_instead_of_creating_one() {
        let (fake, platform) = fake_platform(10);
        Platform::create_post(&*fake, "ch", "old task list", None).await.unwrap();
        let reused_id = fake.posts.lock().unwrap()[0].0.clone();

        let mut exec = ContentExecutor::new(
            "ch".into(),
            None,
            MessageLimits {
                max_length: 10,
                hard_threshold: 10,
            },
        );
        exec.append(&"a".repeat(11));
        let (outcome, reused) = exec.flush_with_reuse(&platform, Some(reused_id.clone())).await.unwrap();
        assert_eq!(outcome, FlushOutcome::Created);
        assert!(reused);
        // Still two posts total: the reused one was updated, not duplicated.
        assert_eq!(fake.posts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn no_overflow_never_consumes_the_reusable_id() {
        let (fake, platform) = fake_platform(1000);
        let mut exec = ContentExecutor::new(
            "ch".into(),
            None,
            MessageLimits {
                max_length: 1000,
                hard_threshold: 1000,
            },
        );
        exec.append("short");
        let (_, reused) = exec.flush_with_reuse(&platform, Some("tasks-1".into())).await.unwrap();
        assert!(!reused);
        assert_eq!(fake.posts.lock().unwrap().len(), 1);
    }
}
