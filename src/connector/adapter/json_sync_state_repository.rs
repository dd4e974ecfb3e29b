use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::application::SyncStateRepository;
use crate::domain::{DomainError, SyncState};

/// Sync state persisted as one pretty-printed JSON file per variant.
///
/// Writes go through a sibling temp file and a rename so a crash mid-write
/// cannot leave a torn state file. Deleting the file is the supported reset
/// path; the next run then refetches full history.
pub struct JsonSyncStateRepository {
    path: PathBuf,
}

impl JsonSyncStateRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SyncStateRepository for JsonSyncStateRepository {
    async fn load(&self) -> Result<SyncState, DomainError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                DomainError::storage(format!(
                    "Corrupt sync state file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No sync state at {}, starting fresh", self.path.display());
                Ok(SyncState::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &SyncState) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| DomainError::storage(format!("Unserializable sync state: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn reset(&self) -> Result<bool, DomainError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
