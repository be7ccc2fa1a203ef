use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("store: embedding for article {0} already exists with a different vector")]
    Conflict(u64),

    #[error("store: no embedding for article {0}")]
    NotFound(u64),

    #[error("store: embedding for article {0} has non-finite components")]
    NonFinite(u64),

    #[error("store: storage error: {0}")]
    Storage(String),

    #[error("store: serialization error: {0}")]
    Serialization(String),
}

impl From<newsdup_kv::KVError> for StoreError {
    fn from(e: newsdup_kv::KVError) -> Self {
        StoreError::Storage(e.to_string())
    }
}
