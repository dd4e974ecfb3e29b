mod in_memory_vector_repository;
mod json_sync_state_repository;
mod mock_embedding;
mod openai_embedding;
mod qdrant_vector_repository;
mod slack_client;

pub use in_memory_vector_repository::*;
pub use json_sync_state_repository::*;
pub use mock_embedding::*;
pub use openai_embedding::*;
pub use qdrant_vector_repository::*;
pub use slack_client::*;
