use thiserror::Error;

/// Errors returned by cluster operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cluster: article {0} not found")]
    ArticleNotFound(u64),

    #[error("cluster: centroid embedding of cluster {cluster_id} (article {article_id}) is missing")]
    MissingCentroid { cluster_id: u64, article_id: u64 },

    #[error("cluster: storage error: {0}")]
    Storage(String),

    #[error("cluster: serialization error: {0}")]
    Serialization(String),

    #[error("cluster: index error: {0}")]
    Index(String),
}

impl From<newsdup_kv::KVError> for ClusterError {
    fn from(e: newsdup_kv::KVError) -> Self {
        ClusterError::Storage(e.to_string())
    }
}

impl From<newsdup_store::StoreError> for ClusterError {
    fn from(e: newsdup_store::StoreError) -> Self {
        ClusterError::Storage(e.to_string())
    }
}

impl From<newsdup_vecindex::VecError> for ClusterError {
    fn from(e: newsdup_vecindex::VecError) -> Self {
        ClusterError::Index(e.to_string())
    }
}
