//! Shared test doubles: a scripted chat platform and a wired sync harness.

// Each test binary uses a different slice of these helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use chatsearch::{
    Channel, ChannelClass, ChannelPage, ChatService, DomainError, HistoryPage,
    InMemoryVectorRepository, JsonSyncStateRepository, Message, MockEmbedding,
    SyncWorkspaceUseCase,
};

/// Channel id that always fails history fetches, for failure-isolation
/// tests.
pub const FAILING_CHANNEL: &str = "C_FAIL";

/// A deterministic, in-memory stand-in for the chat platform.
///
/// Channels are served through the public+private listing class, paged to
/// exercise the enumerator's cursor handling. History is a single page of
/// every message strictly newer than the requested cursor.
pub struct ScriptedChat {
    channel_pages: Vec<Vec<Channel>>,
    history: HashMap<String, Vec<Message>>,
    threads: HashMap<(String, String), Vec<Message>>,
}

impl ScriptedChat {
    pub fn new() -> Self {
        Self {
            channel_pages: Vec::new(),
            history: HashMap::new(),
            threads: HashMap::new(),
        }
    }

    pub fn with_channel_page(mut self, channels: Vec<Channel>) -> Self {
        self.channel_pages.push(channels);
        self
    }

    pub fn with_history(mut self, channel_id: &str, messages: Vec<Message>) -> Self {
        self.history.insert(channel_id.to_string(), messages);
        self
    }

    pub fn with_thread(mut self, channel_id: &str, root_ts: &str, replies: Vec<Message>) -> Self {
        self.threads
            .insert((channel_id.to_string(), root_ts.to_string()), replies);
        self
    }
}

#[async_trait]
impl ChatService for ScriptedChat {
    async fn list_channels_page(
        &self,
        class: ChannelClass,
        cursor: Option<&str>,
    ) -> Result<ChannelPage, DomainError> {
        if class != ChannelClass::PublicAndPrivate {
            return Ok(ChannelPage {
                channels: Vec::new(),
                next_cursor: None,
            });
        }

        let index: usize = cursor.map(|c| c.parse().unwrap_or(0)).unwrap_or(0);
        let channels = self.channel_pages.get(index).cloned().unwrap_or_default();
        let next_cursor = if index + 1 < self.channel_pages.len() {
            Some((index + 1).to_string())
        } else {
            None
        };

        Ok(ChannelPage {
            channels,
            next_cursor,
        })
    }

    async fn fetch_history_page(
        &self,
        channel_id: &str,
        oldest: Option<&str>,
        _cursor: Option<&str>,
    ) -> Result<HistoryPage, DomainError> {
        if channel_id == FAILING_CHANNEL {
            return Err(DomainError::chat_api("simulated connectivity failure"));
        }

        let bound = oldest.map(|o| o.parse::<f64>().unwrap_or(0.0));
        let messages: Vec<Message> = self
            .history
            .get(channel_id)
            .map(|all| {
                all.iter()
                    .filter(|m| bound.map_or(true, |b| m.ts_f64() > b))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(HistoryPage {
            messages,
            next_cursor: None,
            skipped: 0,
        })
    }

    async fn fetch_thread_replies(
        &self,
        channel_id: &str,
        root_ts: &str,
    ) -> Result<Vec<Message>, DomainError> {
        Ok(self
            .threads
            .get(&(channel_id.to_string(), root_ts.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Everything a sync/search test needs, wired against in-memory adapters
/// and a temp-dir state file.
pub struct Harness {
    pub chat: Arc<ScriptedChat>,
    pub embedding: Arc<MockEmbedding>,
    pub vector: Arc<InMemoryVectorRepository>,
    pub state: Arc<JsonSyncStateRepository>,
    #[allow(dead_code)]
    dir: TempDir,
}

impl Harness {
    pub fn new(chat: ScriptedChat) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        Self {
            chat: Arc::new(chat),
            embedding: Arc::new(MockEmbedding::new()),
            vector: Arc::new(InMemoryVectorRepository::new()),
            state: Arc::new(JsonSyncStateRepository::new(dir.path().join("sync_state.json"))),
            dir,
        }
    }

    pub fn sync_use_case(&self) -> SyncWorkspaceUseCase {
        SyncWorkspaceUseCase::new(
            self.chat.clone(),
            self.embedding.clone(),
            self.vector.clone(),
            self.state.clone(),
        )
    }
}

/// A plain public channel the caller has joined.
pub fn channel(id: &str, name: &str) -> Channel {
    Channel::new(id, name, chatsearch::ChannelVisibility::Public)
}

/// A message with an author and text, as produced by the fetcher.
pub fn message(channel_id: &str, ts: &str, author: &str, text: &str) -> Message {
    Message::new(channel_id, ts, format!("U_{}", author), text).with_user_name(author)
}
