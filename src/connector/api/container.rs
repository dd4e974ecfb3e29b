use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::debug;

use crate::application::{ChatService, EmbeddingService, SyncStateRepository, VectorRepository};
use crate::domain::FieldCipher;
use crate::{
    ContextWindowUseCase, InMemoryVectorRepository, JsonSyncStateRepository, MockEmbedding,
    OpenAiEmbedding, QdrantVectorRepository, SearchMessagesUseCase, SlackClient,
    SyncStatusUseCase, SyncWorkspaceUseCase,
};

const PLAINTEXT_STATE_FILE: &str = "sync_state.json";
const ENCRYPTED_STATE_FILE: &str = "sync_state_encrypted.json";
const ENCRYPTION_KEY_ENV: &str = "MESSAGE_ENCRYPTION_KEY";

pub struct ContainerConfig {
    pub data_dir: String,
    /// Mock embeddings + in-memory vector storage; no network needed.
    pub mock: bool,
    pub qdrant_url: Option<String>,
    /// Base collection name; the encrypted variant appends `_encrypted`.
    pub collection: String,
    /// Route every operation through the encrypted variant: its own
    /// collection, its own state file, ciphertext payload fields.
    pub encrypted: bool,
}

/// Builds every dependency once at startup and hands out use cases wired
/// against them. There is no lazy construction: configuration problems
/// (most importantly a missing or malformed encryption key) surface here,
/// before any network activity.
pub struct Container {
    chat: Option<Arc<dyn ChatService>>,
    embedding: Arc<dyn EmbeddingService>,
    vector_repo: Arc<dyn VectorRepository>,
    state_repo: Arc<dyn SyncStateRepository>,
    cipher: Option<Arc<FieldCipher>>,
    config: ContainerConfig,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Result<Self> {
        // The encryption key is validated before anything that could touch
        // the network.
        let cipher: Option<Arc<FieldCipher>> = if config.encrypted {
            let hex_key = std::env::var(ENCRYPTION_KEY_ENV).map_err(|_| {
                anyhow::anyhow!(
                    "{} must be set to a 64-hex-character key for the encrypted variant",
                    ENCRYPTION_KEY_ENV
                )
            })?;
            Some(Arc::new(FieldCipher::from_hex_key(&hex_key)?))
        } else {
            None
        };

        let embedding: Arc<dyn EmbeddingService> = if config.mock {
            debug!("Using mock embedding service");
            Arc::new(MockEmbedding::new())
        } else {
            Arc::new(OpenAiEmbedding::from_env()?)
        };

        let collection = if config.encrypted {
            format!("{}_encrypted", config.collection)
        } else {
            config.collection.clone()
        };

        let vector_repo: Arc<dyn VectorRepository> = if config.mock {
            debug!("Using in-memory vector storage");
            Arc::new(InMemoryVectorRepository::new())
        } else {
            let repo = match config.qdrant_url.clone() {
                Some(url) => QdrantVectorRepository::new(url, collection),
                None => QdrantVectorRepository::from_env(collection),
            };
            debug!("Using vector store collection {}", repo.collection());
            Arc::new(repo)
        };

        let state_file = if config.encrypted {
            ENCRYPTED_STATE_FILE
        } else {
            PLAINTEXT_STATE_FILE
        };
        let state_repo: Arc<dyn SyncStateRepository> = Arc::new(JsonSyncStateRepository::new(
            PathBuf::from(&config.data_dir).join(state_file),
        ));

        // The chat client is only needed for sync; search and status work
        // without read credentials.
        let chat: Option<Arc<dyn ChatService>> = match SlackClient::from_env() {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                debug!("Chat client unavailable: {}", e);
                None
            }
        };

        Ok(Self {
            chat,
            embedding,
            vector_repo,
            state_repo,
            cipher,
            config,
        })
    }

    pub fn sync_use_case(&self) -> Result<SyncWorkspaceUseCase> {
        let Some(chat) = self.chat.clone() else {
            bail!("SLACK_TOKEN environment variable not set (required for sync)");
        };

        let mut use_case = SyncWorkspaceUseCase::new(
            chat,
            self.embedding.clone(),
            self.vector_repo.clone(),
            self.state_repo.clone(),
        );
        if let Some(cipher) = self.cipher.clone() {
            use_case = use_case.with_cipher(cipher);
        }
        Ok(use_case)
    }

    pub fn search_use_case(&self) -> SearchMessagesUseCase {
        let mut use_case =
            SearchMessagesUseCase::new(self.vector_repo.clone(), self.embedding.clone());
        if let Some(cipher) = self.cipher.clone() {
            use_case = use_case.with_cipher(cipher);
        }
        use_case
    }

    pub fn context_use_case(&self) -> ContextWindowUseCase {
        let mut use_case = ContextWindowUseCase::new(self.vector_repo.clone());
        if let Some(cipher) = self.cipher.clone() {
            use_case = use_case.with_cipher(cipher);
        }
        use_case
    }

    pub fn status_use_case(&self) -> SyncStatusUseCase {
        SyncStatusUseCase::new(self.state_repo.clone(), self.vector_repo.clone())
    }

    pub fn state_repo(&self) -> Arc<dyn SyncStateRepository> {
        self.state_repo.clone()
    }

    pub fn data_dir(&self) -> &str {
        &self.config.data_dir
    }

    pub fn encrypted(&self) -> bool {
        self.config.encrypted
    }
}
