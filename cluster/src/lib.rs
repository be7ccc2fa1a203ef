//! Cluster: incremental near-duplicate grouping of article embeddings.
//!
//! Each cluster is anchored on the embedding of the article that founded
//! it. A new article joins the most similar cluster when that similarity
//! reaches the configured threshold, otherwise it founds a cluster of its
//! own. Similarities of joined members are tracked online with Welford's
//! algorithm.
//!
//! Assignment state lives in a [`newsdup_kv::KVStore`]; the centroid index
//! is rebuilt from it with [`Assigner::warm`].

pub mod assigner;
pub mod error;
pub mod keys;
pub mod related;
pub mod repo;
pub mod stats;
pub mod types;

pub use assigner::{Assigner, AssignerConfig, Decision};
pub use error::ClusterError;
pub use related::related;
pub use repo::ClusterRepo;
pub use stats::SimilarityStats;
pub use types::{Article, Assignment, Cluster};
