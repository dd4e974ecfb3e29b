use async_trait::async_trait;

use crate::domain::{Channel, ChannelClass, DomainError, Message};

/// One page of a channel listing.
#[derive(Debug, Clone)]
pub struct ChannelPage {
    pub channels: Vec<Channel>,
    /// Opaque continuation cursor; `None` when the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// One page of channel history.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
    pub next_cursor: Option<String>,
    /// Non-content events (no author or no text) dropped while mapping this
    /// page. Not errors; surfaced so run reports can count them.
    pub skipped: u64,
}

/// Read access to the chat platform.
///
/// Implementations own rate-limit pacing (fixed inter-page delay) and the
/// memoizing author-name cache; callers see resolved [`Message`]s only.
/// Connectivity and auth failures surface as [`DomainError::ChatApiError`]
/// and are not retried at this layer.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Fetch one listing page (size 200) for a channel class.
    async fn list_channels_page(
        &self,
        class: ChannelClass,
        cursor: Option<&str>,
    ) -> Result<ChannelPage, DomainError>;

    /// Fetch one history page of messages strictly newer than `oldest`.
    /// `cursor` continues a prior page within the same fetch.
    async fn fetch_history_page(
        &self,
        channel_id: &str,
        oldest: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<HistoryPage, DomainError>;

    /// Fetch all replies in a thread, excluding the root message.
    async fn fetch_thread_replies(
        &self,
        channel_id: &str,
        root_ts: &str,
    ) -> Result<Vec<Message>, DomainError>;
}
