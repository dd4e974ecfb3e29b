use async_trait::async_trait;

use crate::domain::{DomainError, SyncState};

/// Durable store for one variant's sync state.
///
/// No lock guards concurrent runs against the same state file; a single
/// operator per state file is an accepted constraint.
#[async_trait]
pub trait SyncStateRepository: Send + Sync {
    /// Load the saved state, or the empty state if none has been written.
    async fn load(&self) -> Result<SyncState, DomainError>;

    /// Persist the state. Called once per completed channel so a crash
    /// loses at most the in-flight channel.
    async fn save(&self, state: &SyncState) -> Result<(), DomainError>;

    /// Delete the saved state. Returns whether a state file existed. The
    /// next run refetches full history, which is safe because upserts are
    /// idempotent.
    async fn reset(&self) -> Result<bool, DomainError>;
}
