//! Embedding-based document search and prompt-templated chat.
//!
//! These clients are not part of the triage run; they are exposed for
//! callers that index and query repository documents.

pub mod chat;
pub mod embeddings;
pub mod store;

pub use chat::{ChatChain, Role};
pub use embeddings::EmbeddingClient;
pub use store::{SearchDocument, SearchHit, VectorStore};
