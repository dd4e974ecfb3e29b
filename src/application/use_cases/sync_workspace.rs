use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::application::use_cases::ChannelEnumerator;
use crate::application::{ChatService, EmbeddingService, SyncStateRepository, VectorRepository};
use crate::domain::{
    point_id, Channel, DomainError, FieldCipher, IndexVariant, Message, MessagePayload,
    PointPayload, SyncReport, VectorPoint,
};

/// Bounded fan-out for thread-reply fetches; the only parallel pressure
/// against the chat API.
pub const THREAD_FETCH_CONCURRENCY: usize = 5;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Fetch and index thread replies for newly fetched thread parents.
    pub include_threads: bool,
    /// Per-channel message cap; 0 means unlimited.
    pub message_limit: u64,
    /// Restrict the run to one channel, matched by name or id.
    pub channel_filter: Option<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            include_threads: false,
            message_limit: 0,
            channel_filter: None,
        }
    }
}

struct ChannelOutcome {
    fetched: u64,
    indexed: u64,
    skipped: u64,
    thread_replies: u64,
    new_cursor: Option<String>,
}

/// The incremental sync engine: enumerate channels, fetch history past each
/// saved cursor, fan out thread replies, embed, upsert, checkpoint.
///
/// Failures are isolated per channel: a failed channel is recorded in the
/// run report and its cursor is left untouched, so the next invocation
/// retries it in full. The report is always returned, never raised.
pub struct SyncWorkspaceUseCase {
    chat: Arc<dyn ChatService>,
    embedding: Arc<dyn EmbeddingService>,
    vector_repo: Arc<dyn VectorRepository>,
    state_repo: Arc<dyn SyncStateRepository>,
    cipher: Option<Arc<FieldCipher>>,
}

impl SyncWorkspaceUseCase {
    pub fn new(
        chat: Arc<dyn ChatService>,
        embedding: Arc<dyn EmbeddingService>,
        vector_repo: Arc<dyn VectorRepository>,
        state_repo: Arc<dyn SyncStateRepository>,
    ) -> Self {
        Self {
            chat,
            embedding,
            vector_repo,
            state_repo,
            cipher: None,
        }
    }

    /// Route the run into the encrypted variant: free-text payload fields
    /// are encrypted before upsert and point ids carry the variant suffix.
    pub fn with_cipher(mut self, cipher: Arc<FieldCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    fn variant(&self) -> IndexVariant {
        if self.cipher.is_some() {
            IndexVariant::Encrypted
        } else {
            IndexVariant::Plaintext
        }
    }

    pub async fn execute(&self, options: &SyncOptions) -> Result<SyncReport, DomainError> {
        let start_time = Instant::now();

        self.vector_repo
            .ensure_collection(self.embedding.dimensions())
            .await?;
        let mut state = self.state_repo.load().await?;
        let mut report = SyncReport::default();

        let mut channels = ChannelEnumerator::new(Arc::clone(&self.chat));
        while let Some(channel) = channels.next().await? {
            report.channels_seen += 1;

            if let Some(ref filter) = options.channel_filter {
                if channel.name != *filter && channel.id != *filter {
                    continue;
                }
            }

            let cursor = state.cursor(&channel.id).map(String::from);
            debug!(
                "Syncing #{} ({}) from cursor {:?}",
                channel.name, channel.id, cursor
            );

            match self.sync_channel(&channel, cursor.as_deref(), options).await {
                Ok(outcome) => {
                    // Checkpoint immediately: a crash later in the run loses
                    // at most the channel currently in flight.
                    state.record_channel(
                        &channel.id,
                        &channel.name,
                        outcome.new_cursor.clone(),
                        outcome.indexed,
                    );
                    self.state_repo.save(&state).await?;

                    report.channels_synced += 1;
                    report.messages_fetched += outcome.fetched;
                    report.messages_indexed += outcome.indexed;
                    report.messages_skipped += outcome.skipped;
                    report.thread_replies_indexed += outcome.thread_replies;

                    if outcome.indexed > 0 {
                        info!(
                            "#{}: indexed {} messages ({} thread replies)",
                            channel.name, outcome.indexed, outcome.thread_replies
                        );
                    }
                }
                Err(e) => {
                    warn!("#{}: sync failed: {}", channel.name, e);
                    report.channels_failed += 1;
                    report.errors.push(format!("{}: {}", channel.name, e));
                }
            }
        }

        state.mark_full_sync();
        self.state_repo.save(&state).await?;

        info!(
            "Sync complete: {}/{} channels, {} messages indexed, {} failed in {:.1}s",
            report.channels_synced,
            report.channels_seen,
            report.messages_indexed,
            report.channels_failed,
            start_time.elapsed().as_secs_f64()
        );

        Ok(report)
    }

    async fn sync_channel(
        &self,
        channel: &Channel,
        cursor: Option<&str>,
        options: &SyncOptions,
    ) -> Result<ChannelOutcome, DomainError> {
        let (mut messages, skipped) = self
            .fetch_history(&channel.id, cursor, options.message_limit)
            .await?;

        if messages.is_empty() {
            return Ok(ChannelOutcome {
                fetched: 0,
                indexed: 0,
                skipped,
                thread_replies: 0,
                new_cursor: None,
            });
        }

        let fetched = messages.len() as u64;

        // Thread replies never advance the cursor: the checkpoint is bound
        // to the history fetch path so monotonicity stays provable there.
        let new_cursor = messages
            .iter()
            .max_by(|a, b| {
                a.ts_f64()
                    .partial_cmp(&b.ts_f64())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|m| m.ts.clone());

        let mut thread_replies = 0u64;
        if options.include_threads {
            let roots: Vec<String> = messages
                .iter()
                .filter(|m| m.is_thread_parent())
                .map(|m| m.ts.clone())
                .collect();

            if !roots.is_empty() {
                let replies = self.fetch_threads(&channel.id, &roots).await?;
                let seen: HashSet<String> = messages.iter().map(|m| m.ts.clone()).collect();
                for reply in replies {
                    // Broadcast replies also appear in history; keep one copy.
                    if !seen.contains(&reply.ts) {
                        thread_replies += 1;
                        messages.push(reply);
                    }
                }
            }
        }

        // All of a channel's messages are embedded in one ordered pass
        // before the next channel starts.
        messages.sort_by(|a, b| {
            a.ts_f64()
                .partial_cmp(&b.ts_f64())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let texts: Vec<String> = messages
            .iter()
            .map(|m| m.format_for_embedding(&channel.name))
            .collect();
        let vectors = self.embedding.embed_texts(&texts).await?;
        if vectors.len() != messages.len() {
            return Err(DomainError::embedding(format!(
                "Provider returned {} vectors for {} texts",
                vectors.len(),
                messages.len()
            )));
        }

        let variant = self.variant();
        let mut points = Vec::with_capacity(messages.len());
        for (message, vector) in messages.iter().zip(vectors) {
            let fields = MessagePayload::from_message(message, &channel.name);
            let payload = match self.cipher.as_deref() {
                Some(cipher) => PointPayload::EncryptedMessage(cipher.encrypt_payload(fields)?),
                None => PointPayload::Message(fields),
            };
            points.push(VectorPoint::new(
                point_id(&message.channel_id, &message.ts, variant),
                vector,
                payload,
            ));
        }

        self.vector_repo.upsert_points(&points).await?;

        Ok(ChannelOutcome {
            fetched,
            indexed: points.len() as u64,
            skipped,
            thread_replies,
            new_cursor,
        })
    }

    /// Page history strictly newer than `cursor`, stopping early at `limit`
    /// (0 = unlimited).
    async fn fetch_history(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<(Vec<Message>, u64), DomainError> {
        let mut messages: Vec<Message> = Vec::new();
        let mut skipped = 0u64;
        let mut page_cursor: Option<String> = None;

        loop {
            let page = self
                .chat
                .fetch_history_page(channel_id, cursor, page_cursor.as_deref())
                .await?;
            skipped += page.skipped;
            messages.extend(page.messages);

            if limit > 0 && messages.len() as u64 >= limit {
                messages.truncate(limit as usize);
                break;
            }

            match page.next_cursor {
                Some(c) if !c.is_empty() => page_cursor = Some(c),
                _ => break,
            }
        }

        Ok((messages, skipped))
    }

    /// Fetch replies for a batch of thread roots on a bounded worker pool.
    /// Each task returns its own reply list; lists are merged as tasks
    /// complete (out of pool order is fine, the caller re-sorts). ETA shown
    /// on the progress bar comes from a running average of completed-thread
    /// latency.
    async fn fetch_threads(
        &self,
        channel_id: &str,
        roots: &[String],
    ) -> Result<Vec<Message>, DomainError> {
        let total = roots.len();
        let progress_bar = ProgressBar::new(total as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} threads {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );

        let started = Instant::now();
        let mut results = stream::iter(roots.iter().cloned().map(|root| {
            let chat = Arc::clone(&self.chat);
            let channel_id = channel_id.to_string();
            async move { chat.fetch_thread_replies(&channel_id, &root).await }
        }))
        .buffer_unordered(THREAD_FETCH_CONCURRENCY);

        let mut replies = Vec::new();
        let mut completed = 0usize;
        while let Some(result) = results.next().await {
            let batch = result?;
            completed += 1;

            let avg = started.elapsed().as_secs_f64() / completed as f64;
            let eta = avg * (total - completed) as f64;
            progress_bar.set_message(format!("{:.1}s/thread, eta {:.0}s", avg, eta));
            progress_bar.inc(1);

            replies.extend(batch);
        }
        progress_bar.finish_and_clear();

        debug!(
            "Fetched {} thread replies across {} roots",
            replies.len(),
            total
        );
        Ok(replies)
    }
}
