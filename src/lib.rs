pub mod application;
pub mod connector;
pub mod domain;

pub use application::{
    ChannelEnumerator, ChannelPage, ChatService, ContextWindowUseCase, EmbeddingService,
    HistoryPage, ScoredPoint, SearchMessagesUseCase, StatusReport, SyncOptions,
    SyncStateRepository, SyncStatusUseCase, SyncWorkspaceUseCase, VectorRepository,
};

pub use connector::{
    Container, ContainerConfig, InMemoryVectorRepository, JsonSyncStateRepository, MockEmbedding,
    OpenAiEmbedding, QdrantVectorRepository, SlackClient,
};

pub use domain::{
    point_id, Channel, ChannelClass, ChannelSyncState, ChannelVisibility, DomainError,
    FieldCipher, IndexVariant, Message, MessagePayload, PointFilter, PointPayload, SearchQuery,
    SearchResult, SyncReport, SyncState, VectorPoint, PAYLOAD_VERSION,
};
