use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::{ChannelPage, ChatService, HistoryPage};
use crate::domain::{Channel, ChannelClass, ChannelVisibility, DomainError, Message};

const DEFAULT_BASE_URL: &str = "https://slack.com/api";
/// Listing and history page size.
const PAGE_SIZE: u32 = 200;
/// Client-side pacing between continuation pages. The platform budget is
/// roughly 50 requests/min, so 1.2 s spacing stays under it.
const PAGE_DELAY: Duration = Duration::from_millis(1200);

const LIST_PATH: &str = "/conversations.list";
const HISTORY_PATH: &str = "/conversations.history";
const REPLIES_PATH: &str = "/conversations.replies";
const USER_INFO_PATH: &str = "/users.info";

/// HTTP client for the Slack-compatible read API.
///
/// Implements [`ChatService`]: cursor-paginated channel listing and
/// history, thread-reply fetch, and author-name resolution through a
/// memoizing id→name cache shared across calls. Rate limiting is
/// client-side only — a fixed delay before every continuation page.
///
/// Configured from the environment:
///
/// ```text
/// SLACK_TOKEN=xoxb-...                       # read-scope token, required
/// SLACK_BASE_URL=https://slack.com/api       # override for tests/proxies
/// ```
pub struct SlackClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
    /// Author id → display name; `None` caches failed lookups too so a
    /// broken user record costs one request, not one per message.
    user_cache: Mutex<HashMap<String, Option<String>>>,
}

impl SlackClient {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base: String = base_url.into();
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            token: token.into(),
            base_url: base.trim_end_matches('/').to_string(),
            user_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Result<Self, DomainError> {
        let token = std::env::var("SLACK_TOKEN")
            .map_err(|_| DomainError::chat_api("SLACK_TOKEN environment variable not set"))?;
        let base =
            std::env::var("SLACK_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(token, base))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, DomainError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(params)
            .send()
            .await
            .map_err(|e| DomainError::chat_api(format!("Request to {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(DomainError::chat_api(format!(
                "{} returned HTTP {}",
                path, status
            )));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            DomainError::chat_api(format!("Failed to parse {} response: {}", path, e))
        })?;

        if !envelope.ok {
            return Err(DomainError::chat_api(format!(
                "{} failed: {}",
                path,
                envelope.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        Ok(envelope.body)
    }

    /// Fixed inter-page delay, applied before continuation pages only.
    async fn page_pause(&self, cursor: Option<&str>) {
        if cursor.is_some() {
            tokio::time::sleep(PAGE_DELAY).await;
        }
    }

    async fn resolve_user_name(&self, user_id: &str) -> Option<String> {
        {
            let cache = self.user_cache.lock().await;
            if let Some(cached) = cache.get(user_id) {
                return cached.clone();
            }
        }

        let resolved = match self
            .call::<UserBody>(USER_INFO_PATH, &[("user", user_id.to_string())])
            .await
        {
            Ok(body) => body.user.and_then(|u| u.display_name()),
            Err(e) => {
                // Name resolution is best-effort; an unresolvable author is
                // indexed by id, not dropped.
                warn!("User lookup for {} failed: {}", user_id, e);
                None
            }
        };

        let mut cache = self.user_cache.lock().await;
        cache.insert(user_id.to_string(), resolved.clone());
        resolved
    }

    /// Map a raw history entry to a [`Message`], dropping non-content
    /// events (no author or no text) silently.
    async fn map_message(&self, channel_id: &str, raw: RawMessage) -> Option<Message> {
        let user_id = raw.user.filter(|u| !u.is_empty())?;
        let text = raw.text.filter(|t| !t.is_empty())?;

        let mut message = Message::new(channel_id, raw.ts, user_id.clone(), text);
        if let Some(thread_ts) = raw.thread_ts.filter(|t| !t.is_empty()) {
            message = message.with_thread_ts(thread_ts);
        }
        if let Some(name) = self.resolve_user_name(&user_id).await {
            message = message.with_user_name(name);
        }
        Some(message)
    }

    fn types_param(class: ChannelClass) -> &'static str {
        match class {
            ChannelClass::PublicAndPrivate => "public_channel,private_channel",
            ChannelClass::Direct => "im",
            ChannelClass::Group => "mpim",
        }
    }
}

#[async_trait]
impl ChatService for SlackClient {
    async fn list_channels_page(
        &self,
        class: ChannelClass,
        cursor: Option<&str>,
    ) -> Result<ChannelPage, DomainError> {
        self.page_pause(cursor).await;

        let mut params = vec![
            ("types", Self::types_param(class).to_string()),
            ("limit", PAGE_SIZE.to_string()),
            ("exclude_archived", "true".to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        let body: ListBody = self.call(LIST_PATH, &params).await?;
        let next_cursor = body.next_cursor();
        let channels = body.channels.into_iter().map(RawChannel::into_channel).collect();

        Ok(ChannelPage {
            channels,
            next_cursor,
        })
    }

    async fn fetch_history_page(
        &self,
        channel_id: &str,
        oldest: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<HistoryPage, DomainError> {
        self.page_pause(cursor).await;

        let mut params = vec![
            ("channel", channel_id.to_string()),
            ("limit", PAGE_SIZE.to_string()),
        ];
        if let Some(oldest) = oldest {
            // The oldest bound is exclusive: only strictly newer messages.
            params.push(("oldest", oldest.to_string()));
        }
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        let body: HistoryBody = self.call(HISTORY_PATH, &params).await?;
        let next_cursor = body.next_cursor();
        let raw_count = body.messages.len() as u64;

        let mut messages = Vec::with_capacity(body.messages.len());
        for raw in body.messages {
            if let Some(message) = self.map_message(channel_id, raw).await {
                messages.push(message);
            }
        }
        let skipped = raw_count - messages.len() as u64;

        debug!(
            "History page for {}: {} messages ({} skipped)",
            channel_id,
            messages.len(),
            skipped
        );

        Ok(HistoryPage {
            messages,
            next_cursor,
            skipped,
        })
    }

    async fn fetch_thread_replies(
        &self,
        channel_id: &str,
        root_ts: &str,
    ) -> Result<Vec<Message>, DomainError> {
        let mut replies = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            self.page_pause(cursor.as_deref()).await;

            let mut params = vec![
                ("channel", channel_id.to_string()),
                ("ts", root_ts.to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ];
            if let Some(ref cursor) = cursor {
                params.push(("cursor", cursor.clone()));
            }

            let body: HistoryBody = self.call(REPLIES_PATH, &params).await?;
            let next_cursor = body.next_cursor();
            for raw in body.messages {
                // The root message is part of the replies response.
                if raw.ts == root_ts {
                    continue;
                }
                if let Some(message) = self.map_message(channel_id, raw).await {
                    replies.push(message);
                }
            }

            match next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(replies)
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Deserialize, Default)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct ListBody {
    #[serde(default)]
    channels: Vec<RawChannel>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

impl ListBody {
    fn next_cursor(&self) -> Option<String> {
        cursor_from_metadata(self.response_metadata.as_ref())
    }
}

#[derive(Deserialize)]
struct HistoryBody {
    #[serde(default)]
    messages: Vec<RawMessage>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

impl HistoryBody {
    fn next_cursor(&self) -> Option<String> {
        cursor_from_metadata(self.response_metadata.as_ref())
    }
}

fn cursor_from_metadata(metadata: Option<&ResponseMetadata>) -> Option<String> {
    metadata
        .map(|m| m.next_cursor.clone())
        .filter(|c| !c.is_empty())
}

#[derive(Deserialize)]
struct RawChannel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    is_member: Option<bool>,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    is_im: bool,
    #[serde(default)]
    is_mpim: bool,
    /// Peer user id for direct conversations, which carry no name.
    #[serde(default)]
    user: Option<String>,
}

impl RawChannel {
    fn into_channel(self) -> Channel {
        let visibility = if self.is_im {
            ChannelVisibility::Direct
        } else if self.is_mpim {
            ChannelVisibility::Group
        } else if self.is_private {
            ChannelVisibility::Private
        } else {
            ChannelVisibility::Public
        };

        let name = self
            .name
            .filter(|n| !n.is_empty())
            .or(self.user)
            .unwrap_or_else(|| self.id.clone());

        // Direct conversations have no membership flag; being listed is
        // membership enough.
        let is_member = self.is_member.unwrap_or(self.is_im);

        Channel::new(self.id, name, visibility).with_membership(is_member)
    }
}

#[derive(Deserialize)]
struct RawMessage {
    ts: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

#[derive(Deserialize)]
struct UserBody {
    #[serde(default)]
    user: Option<RawUser>,
}

#[derive(Deserialize)]
struct RawUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    profile: Option<RawProfile>,
}

#[derive(Deserialize)]
struct RawProfile {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
}

impl RawUser {
    fn display_name(self) -> Option<String> {
        let profile = self.profile;
        profile
            .as_ref()
            .and_then(|p| p.display_name.clone())
            .filter(|n| !n.is_empty())
            .or_else(|| {
                profile
                    .as_ref()
                    .and_then(|p| p.real_name.clone())
                    .filter(|n| !n.is_empty())
            })
            .or_else(|| self.name.filter(|n| !n.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_visibility_mapping() {
        let raw: RawChannel = serde_json::from_value(serde_json::json!({
            "id": "D1", "is_im": true, "user": "U42"
        }))
        .expect("deserialize");
        let channel = raw.into_channel();

        assert_eq!(channel.visibility, ChannelVisibility::Direct);
        assert_eq!(channel.name, "U42");
        assert!(channel.is_member);
    }

    #[test]
    fn test_non_member_channel() {
        let raw: RawChannel = serde_json::from_value(serde_json::json!({
            "id": "C1", "name": "general", "is_member": false
        }))
        .expect("deserialize");
        let channel = raw.into_channel();

        assert_eq!(channel.visibility, ChannelVisibility::Public);
        assert!(!channel.is_member);
    }

    #[test]
    fn test_display_name_preference() {
        let user: RawUser = serde_json::from_value(serde_json::json!({
            "name": "alice.j",
            "profile": { "display_name": "alice", "real_name": "Alice Jones" }
        }))
        .expect("deserialize");
        assert_eq!(user.display_name().as_deref(), Some("alice"));

        let fallback: RawUser = serde_json::from_value(serde_json::json!({
            "name": "bob.k",
            "profile": { "display_name": "", "real_name": "" }
        }))
        .expect("deserialize");
        assert_eq!(fallback.display_name().as_deref(), Some("bob.k"));
    }

    #[test]
    fn test_envelope_error_detection() {
        let envelope: Envelope<ListBody> = serde_json::from_value(serde_json::json!({
            "ok": false, "error": "invalid_auth"
        }))
        .expect("deserialize");
        assert!(!envelope.ok);
        assert_eq!(envelope.error.as_deref(), Some("invalid_auth"));
    }
}
