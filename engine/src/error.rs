use newsdup_cluster::ClusterError;
use newsdup_kv::KVError;
use newsdup_knn::KnnError;
use newsdup_store::StoreError;
use newsdup_vecindex::VecError;
use thiserror::Error;

use crate::embedder::EmbedError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine: invalid config: {0}")]
    Config(String),

    #[error("engine: no record for article {0}")]
    NotFound(u64),

    #[error("engine: article {0} has no category")]
    Unlabeled(u64),

    #[error("engine: stored {field} is {stored}, configured {current}")]
    MetaMismatch {
        field: &'static str,
        stored: String,
        current: String,
    },

    #[error("engine: embedding of article {article_id} rejected: {source}")]
    InvalidEmbedding {
        article_id: u64,
        #[source]
        source: VecError,
    },

    #[error("engine: embedder produces {embedder}-dimensional vectors, configured {configured}")]
    EmbedderDimension { configured: usize, embedder: usize },

    #[error("engine: serialization error: {0}")]
    Serialization(String),

    #[error("engine: kv error: {0}")]
    KV(#[from] KVError),

    #[error("engine: {0}")]
    Store(StoreError),

    #[error("engine: {0}")]
    Cluster(ClusterError),

    #[error("engine: {0}")]
    Knn(#[from] KnnError),

    #[error("engine: {0}")]
    Embed(#[from] EmbedError),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            other => EngineError::Store(other),
        }
    }
}

impl From<ClusterError> for EngineError {
    fn from(e: ClusterError) -> Self {
        match e {
            ClusterError::ArticleNotFound(id) => EngineError::NotFound(id),
            other => EngineError::Cluster(other),
        }
    }
}
