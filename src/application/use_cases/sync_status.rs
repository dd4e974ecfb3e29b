use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::application::{SyncStateRepository, VectorRepository};
use crate::domain::{ChannelSyncState, DomainError};

/// Snapshot of one variant's sync state plus the live point count.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub channels: Vec<ChannelSyncState>,
    pub last_full_sync: Option<DateTime<Utc>>,
    pub total_messages: u64,
    pub indexed_points: u64,
}

pub struct SyncStatusUseCase {
    state_repo: Arc<dyn SyncStateRepository>,
    vector_repo: Arc<dyn VectorRepository>,
}

impl SyncStatusUseCase {
    pub fn new(
        state_repo: Arc<dyn SyncStateRepository>,
        vector_repo: Arc<dyn VectorRepository>,
    ) -> Self {
        Self {
            state_repo,
            vector_repo,
        }
    }

    pub async fn execute(&self) -> Result<StatusReport, DomainError> {
        let state = self.state_repo.load().await?;
        // Status should still render when the store is unreachable.
        let indexed_points = match self.vector_repo.count().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Point count unavailable: {}", e);
                0
            }
        };

        Ok(StatusReport {
            channels: state.channels.into_values().collect(),
            last_full_sync: state.last_full_sync,
            total_messages: state.total_messages,
            indexed_points,
        })
    }
}
