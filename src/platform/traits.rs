//! Platform adapter trait and dynamic-dispatch companion (§6).
//!
//! Mattermost/Slack REST and WebSocket details are out of scope — this
//! module only defines the contract the core consumes; concrete adapters
//! live outside this crate.

use crate::content::format::Formatter;
use crate::error::Result;
use crate::{InboundEvent, PostId, ThreadMessage};
use std::pin::Pin;

/// A freshly created or updated post's identity and timestamp.
#[derive(Debug, Clone)]
pub struct PostHandle {
    pub id: PostId,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The platform's message-length rules, used by the content executor.
#[derive(Debug, Clone, Copy)]
pub struct MessageLimits {
    pub max_length: usize,
    pub hard_threshold: usize,
}

/// Inbound event stream type.
pub type InboundStream = Pin<Box<dyn futures::Stream<Item = InboundEvent> + Send>>;

/// Static trait for platform adapters. Prefer this for type-safe call sites;
/// use [`PlatformDyn`] when storing heterogeneous adapters behind `Arc<dyn _>`.
pub trait Platform: Send + Sync + 'static {
    /// Unique name for this platform connection (e.g. "mattermost").
    fn name(&self) -> &str;

    fn connect(&self) -> impl std::future::Future<Output = Result<InboundStream>> + Send;

    fn disconnect(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn create_post(
        &self,
        channel: &str,
        text: &str,
        thread_root: Option<&str>,
    ) -> impl std::future::Future<Output = Result<PostHandle>> + Send;

    fn update_post(&self, id: &str, text: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    fn delete_post(&self, id: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Post and add the given reactions to it in one step.
    fn create_interactive_post(
        &self,
        channel: &str,
        text: &str,
        reactions: &[&str],
        thread_root: Option<&str>,
    ) -> impl std::future::Future<Output = Result<PostHandle>> + Send;

    fn add_reaction(&self, id: &str, emoji: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    fn remove_reaction(&self, id: &str, emoji: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    fn thread_history(
        &self,
        thread_root: &str,
        limit: Option<usize>,
        exclude_bot_messages: bool,
    ) -> impl std::future::Future<Output = Result<Vec<ThreadMessage>>> + Send;

    fn pin_post(&self, id: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    fn unpin_post(&self, id: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    fn pinned_posts(&self, channel: &str) -> impl std::future::Future<Output = Result<Vec<PostId>>> + Send;

    fn bot_user(&self) -> impl std::future::Future<Output = Result<String>> + Send;
    fn user_by_username(&self, name: &str) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
    fn is_user_allowed(&self, name: &str) -> bool;
    fn is_bot_mentioned(&self, text: &str) -> bool;
    fn extract_prompt(&self, text: &str) -> String;

    fn formatter(&self) -> &dyn Formatter;
    fn message_limits(&self) -> MessageLimits;

    fn send_typing(&self, channel: &str) -> impl std::future::Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Dynamic trait for runtime polymorphism — stored as `Arc<dyn PlatformDyn>`
/// in [`crate::platform::manager::PlatformManager`].
pub trait PlatformDyn: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn connect<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<InboundStream>> + Send + 'a>>;
    fn disconnect<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn create_post<'a>(
        &'a self,
        channel: &'a str,
        text: &'a str,
        thread_root: Option<&'a str>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<PostHandle>> + Send + 'a>>;

    fn update_post<'a>(
        &'a self,
        id: &'a str,
        text: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn delete_post<'a>(&'a self, id: &'a str) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn create_interactive_post<'a>(
        &'a self,
        channel: &'a str,
        text: &'a str,
        reactions: &'a [&'a str],
        thread_root: Option<&'a str>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<PostHandle>> + Send + 'a>>;

    fn add_reaction<'a>(
        &'a self,
        id: &'a str,
        emoji: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn remove_reaction<'a>(
        &'a self,
        id: &'a str,
        emoji: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn thread_history<'a>(
        &'a self,
        thread_root: &'a str,
        limit: Option<usize>,
        exclude_bot_messages: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<ThreadMessage>>> + Send + 'a>>;

    fn pin_post<'a>(&'a self, id: &'a str) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;
    fn unpin_post<'a>(&'a self, id: &'a str) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;
    fn pinned_posts<'a>(
        &'a self,
        channel: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<PostId>>> + Send + 'a>>;

    fn bot_user<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<String>> + Send + 'a>>;
    fn user_by_username<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Option<String>>> + Send + 'a>>;
    fn is_user_allowed(&self, name: &str) -> bool;
    fn is_bot_mentioned(&self, text: &str) -> bool;
    fn extract_prompt(&self, text: &str) -> String;

    fn formatter(&self) -> &dyn Formatter;
    fn message_limits(&self) -> MessageLimits;

    fn send_typing<'a>(&'a self, channel: &'a str) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;
}

impl<T: Platform> PlatformDyn for T {
    fn name(&self) -> &str {
        Platform::name(self)
    }

    fn connect<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<InboundStream>> + Send + 'a>> {
        Box::pin(Platform::connect(self))
    }

    fn disconnect<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Platform::disconnect(self))
    }

    fn create_post<'a>(
        &'a self,
        channel: &'a str,
        text: &'a str,
        thread_root: Option<&'a str>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<PostHandle>> + Send + 'a>> {
        Box::pin(Platform::create_post(self, channel, text, thread_root))
    }

    fn update_post<'a>(
        &'a self,
        id: &'a str,
        text: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Platform::update_post(self, id, text))
    }

    fn delete_post<'a>(&'a self, id: &'a str) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Platform::delete_post(self, id))
    }

    fn create_interactive_post<'a>(
        &'a self,
        channel: &'a str,
        text: &'a str,
        reactions: &'a [&'a str],
        thread_root: Option<&'a str>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<PostHandle>> + Send + 'a>> {
        Box::pin(Platform::create_interactive_post(
            self,
            channel,
            text,
            reactions,
            thread_root,
        ))
    }

    fn add_reaction<'a>(
        &'a self,
        id: &'a str,
        emoji: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Platform::add_reaction(self, id, emoji))
    }

    fn remove_reaction<'a>(
        &'a self,
        id: &'a str,
        emoji: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Platform::remove_reaction(self, id, emoji))
    }

    fn thread_history<'a>(
        &'a self,
        thread_root: &'a str,
        limit: Option<usize>,
        exclude_bot_messages: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<ThreadMessage>>> + Send + 'a>> {
        Box::pin(Platform::thread_history(self, thread_root, limit, exclude_bot_messages))
    }

    fn pin_post<'a>(&'a self, id: &'a str) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Platform::pin_post(self, id))
    }

    fn unpin_post<'a>(&'a self, id: &'a str) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Platform::unpin_post(self, id))
    }

    fn pinned_posts<'a>(
        &'a self,
        channel: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<PostId>>> + Send + 'a>> {
        Box::pin(Platform::pinned_posts(self, channel))
    }

    fn bot_user<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(Platform::bot_user(self))
    }

    fn user_by_username<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(Platform::user_by_username(self, name))
    }

    fn is_user_allowed(&self, name: &str) -> bool {
        Platform::is_user_allowed(self, name)
    }

    fn is_bot_mentioned(&self, text: &str) -> bool {
        Platform::is_bot_mentioned(self, text)
    }

    fn extract_prompt(&self, text: &str) -> String {
        Platform::extract_prompt(self, text)
    }

    fn formatter(&self) -> &dyn Formatter {
        Platform::formatter(self)
    }

    fn message_limits(&self) -> MessageLimits {
        Platform::message_limits(self)
    }

    fn send_typing<'a>(&'a self, channel: &'a str) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Platform::send_typing(self, channel))
    }
}
