use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A single chat message fetched from the platform.
///
/// Identity within a channel is the platform timestamp (`ts`), a decimal
/// string such as `"1712345678.000100"` that is unique per channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub channel_id: String,
    pub ts: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub text: String,
    pub thread_ts: Option<String>,
}

impl Message {
    pub fn new(
        channel_id: impl Into<String>,
        ts: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            ts: ts.into(),
            user_id: user_id.into(),
            user_name: None,
            text: text.into(),
            thread_ts: None,
        }
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn with_thread_ts(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    /// A thread parent carries its own timestamp as the thread root.
    pub fn is_thread_parent(&self) -> bool {
        self.thread_ts.as_deref() == Some(self.ts.as_str())
    }

    /// A reply belongs to a thread rooted at another message.
    pub fn is_thread_reply(&self) -> bool {
        matches!(self.thread_ts.as_deref(), Some(root) if root != self.ts)
    }

    /// Numeric timestamp for range comparisons. Malformed timestamps sort
    /// first rather than poisoning the whole batch.
    pub fn ts_f64(&self) -> f64 {
        self.ts.parse::<f64>().unwrap_or(0.0)
    }

    /// Render the message for embedding: `"{author}: {text} [in #{channel}] [{date}]"`,
    /// omitting absent fields so author/channel/date context participates in
    /// the vector without inventing placeholders.
    pub fn format_for_embedding(&self, channel_name: &str) -> String {
        let mut out = String::new();

        if let Some(name) = self.user_name.as_deref().filter(|n| !n.is_empty()) {
            out.push_str(name);
            out.push_str(": ");
        }
        out.push_str(&self.text);
        if !channel_name.is_empty() {
            out.push_str(&format!(" [in #{}]", channel_name));
        }
        if let Some(date) = self.date_string() {
            out.push_str(&format!(" [{}]", date));
        }

        out
    }

    fn date_string(&self) -> Option<String> {
        let secs = self.ts_f64() as i64;
        if secs <= 0 {
            return None;
        }
        Utc.timestamp_opt(secs, 0)
            .single()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
    }
}
