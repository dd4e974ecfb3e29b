mod chat_service;
mod embedding_service;
mod sync_state_repository;
mod vector_repository;

pub use chat_service::*;
pub use embedding_service::*;
pub use sync_state_repository::*;
pub use vector_repository::*;
