use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-channel sync checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSyncState {
    pub channel_id: String,
    pub channel_name: String,
    /// Timestamp of the newest synced message; the next fetch is bounded to
    /// strictly newer messages. `None` until the first successful pass.
    pub last_synced_ts: Option<String>,
    pub message_count: u64,
    pub last_sync_time: DateTime<Utc>,
}

/// Durable sync state for one index variant, persisted as a single
/// human-readable JSON file. Channels are keyed by id; the BTreeMap keeps
/// the file diffable between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelSyncState>,
    #[serde(default)]
    pub last_full_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_messages: u64,
}

impl SyncState {
    /// Cursor for a channel, if it has ever completed a sync pass.
    pub fn cursor(&self, channel_id: &str) -> Option<&str> {
        self.channels
            .get(channel_id)
            .and_then(|c| c.last_synced_ts.as_deref())
    }

    /// Record a completed channel pass. The cursor never moves backwards:
    /// an empty fetch keeps the previous value, and a smaller candidate is
    /// ignored so `last_synced_ts` is non-decreasing across runs.
    pub fn record_channel(
        &mut self,
        channel_id: &str,
        channel_name: &str,
        new_cursor: Option<String>,
        indexed: u64,
    ) {
        let now = Utc::now();
        let entry = self
            .channels
            .entry(channel_id.to_string())
            .or_insert_with(|| ChannelSyncState {
                channel_id: channel_id.to_string(),
                channel_name: channel_name.to_string(),
                last_synced_ts: None,
                message_count: 0,
                last_sync_time: now,
            });

        entry.channel_name = channel_name.to_string();
        entry.message_count += indexed;
        entry.last_sync_time = now;

        if let Some(candidate) = new_cursor {
            let advance = match entry.last_synced_ts.as_deref() {
                Some(current) => ts_cmp(&candidate, current) == std::cmp::Ordering::Greater,
                None => true,
            };
            if advance {
                entry.last_synced_ts = Some(candidate);
            }
        }

        self.total_messages = self.channels.values().map(|c| c.message_count).sum();
    }

    pub fn mark_full_sync(&mut self) {
        self.last_full_sync = Some(Utc::now());
    }
}

fn ts_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    let a = a.parse::<f64>().unwrap_or(0.0);
    let b = b.parse::<f64>().unwrap_or(0.0);
    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
}

/// Summary of one sync run. Per-channel failures are collected here rather
/// than raised, so callers always receive a complete run report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub channels_seen: u64,
    pub channels_synced: u64,
    pub channels_failed: u64,
    pub messages_fetched: u64,
    pub messages_indexed: u64,
    pub messages_skipped: u64,
    pub thread_replies_indexed: u64,
    pub errors: Vec<String>,
}
