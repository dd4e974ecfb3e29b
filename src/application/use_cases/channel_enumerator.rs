use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::application::ChatService;
use crate::domain::{Channel, ChannelClass, DomainError};

/// Pull-based channel discovery.
///
/// Walks the listing classes in order (public+private, direct, group),
/// advancing its own pagination cursor internally so the full channel list
/// is never buffered. Channels where the caller is not a member are
/// skipped. Not restartable mid-stream: a new enumeration rescans from
/// fresh cursors. Platform errors propagate uncaught; no retry here.
pub struct ChannelEnumerator {
    chat: Arc<dyn ChatService>,
    class_index: usize,
    cursor: Option<String>,
    buffer: VecDeque<Channel>,
    exhausted: bool,
}

impl ChannelEnumerator {
    pub fn new(chat: Arc<dyn ChatService>) -> Self {
        Self {
            chat,
            class_index: 0,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Next accessible channel, or `None` when every class is exhausted.
    pub async fn next(&mut self) -> Result<Option<Channel>, DomainError> {
        loop {
            if let Some(channel) = self.buffer.pop_front() {
                return Ok(Some(channel));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fill_buffer().await?;
        }
    }

    async fn fill_buffer(&mut self) -> Result<(), DomainError> {
        while self.class_index < ChannelClass::ALL.len() {
            let class = ChannelClass::ALL[self.class_index];
            let page = self
                .chat
                .list_channels_page(class, self.cursor.as_deref())
                .await?;

            let fetched = page.channels.len();
            let members = page
                .channels
                .into_iter()
                .filter(|c| c.is_member)
                .collect::<Vec<_>>();
            debug!(
                "Listed {} channels ({} joined) for class {:?}",
                fetched,
                members.len(),
                class
            );
            self.buffer.extend(members);

            match page.next_cursor {
                Some(cursor) if !cursor.is_empty() => {
                    self.cursor = Some(cursor);
                }
                _ => {
                    self.cursor = None;
                    self.class_index += 1;
                }
            }

            if !self.buffer.is_empty() {
                return Ok(());
            }
        }

        self.exhausted = true;
        Ok(())
    }
}
