//! newsdup engine: near-duplicate clustering and category classification
//! for a news pipeline.
//!
//! A [`RunContext`] is opened per pipeline run. It stores article
//! embeddings, assigns each article to a cluster of near-duplicates, answers
//! related-article queries and classifies articles by their nearest
//! labeled neighbors.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::NaiveDate;
//! use newsdup_engine::{EngineConfig, RunContext};
//! use newsdup_kv::RedbStore;
//!
//! let kv = Arc::new(RedbStore::open("newsdup.redb")?);
//! let run_date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
//! let ctx = RunContext::open(EngineConfig::default(), kv, run_date)?;
//! let cluster_id = ctx.assign_cluster(42)?;
//! let related = ctx.get_related(42, 2)?;
//! # let _ = (cluster_id, related);
//! ctx.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod context;
pub mod embedder;
pub mod error;


pub use config::EngineConfig;
pub use context::RunContext;
pub use embedder::{EmbedError, Embedder};
pub use error::EngineError;

pub use newsdup_cluster::{Article, Assignment, Cluster, SimilarityStats};
pub use newsdup_knn::{ConfusionMatrix, Evaluation, Prediction, VoteTally};
pub use newsdup_store::Put;
pub use newsdup_vecindex::{IndexKind, Metric};
