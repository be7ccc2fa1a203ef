//! Embedding Store: one immutable vector per article, kept in a KV store.
//!
//! Embeddings are appended to a creation-ordered log (`{prefix}:emb:{seq}`)
//! with a reverse index from article id to sequence number, so that
//! [`EmbeddingStore::load_all`] replays them in the order they were written.

pub mod error;
pub mod keys;
pub mod store;

pub use error::StoreError;
pub use store::{EmbeddingCursor, EmbeddingRecord, EmbeddingStore, Put};
