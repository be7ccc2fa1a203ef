use std::path::Path;

use newsdup_cluster::AssignerConfig;
use newsdup_knn::KnnConfig;
use newsdup_vecindex::{IndexKind, Metric};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Engine configuration. Every field is optional in YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Length of every stored embedding.
    pub embedding_dimension: usize,

    /// Minimum similarity for an article to join an existing cluster.
    pub similarity_threshold: f32,

    /// Similarity tolerance under which candidate clusters count as tied.
    pub epsilon: f32,

    /// Neighbors consulted by the classifier.
    pub k: usize,

    pub distance_mode: Metric,

    pub index: IndexKind,

    /// Clusters founded up to this many days before the run date are still
    /// open for new members.
    pub lookback_days: u32,

    /// Nearest centroids inspected when breaking ties.
    pub tie_candidates: usize,

    /// Namespace of every KV key the engine writes.
    pub prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: 768,
            similarity_threshold: 0.85,
            epsilon: 1e-6,
            k: 5,
            distance_mode: Metric::Cosine,
            index: IndexKind::Flat,
            lookback_days: 2,
            tie_candidates: 8,
            prefix: "news".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, EngineError> {
        let cfg: EngineConfig =
            serde_yaml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("read {}: {}", path.display(), e)))?;
        let cfg: EngineConfig = serde_yaml::from_str(&data)
            .map_err(|e| EngineError::Config(format!("parse {}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |msg: String| Err(EngineError::Config(msg));
        if self.embedding_dimension == 0 {
            return fail("embedding_dimension must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return fail(format!(
                "similarity_threshold must be in [0, 1], got {}",
                self.similarity_threshold
            ));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return fail(format!("epsilon must be finite and >= 0, got {}", self.epsilon));
        }
        if self.k == 0 {
            return fail("k must be at least 1".into());
        }
        if self.tie_candidates == 0 {
            return fail("tie_candidates must be at least 1".into());
        }
        if self.prefix.is_empty() || self.prefix.contains(':') {
            return fail(format!("prefix must be non-empty without ':', got {:?}", self.prefix));
        }
        Ok(())
    }

    pub fn assigner_config(&self) -> AssignerConfig {
        AssignerConfig {
            dim: self.embedding_dimension,
            similarity_threshold: self.similarity_threshold,
            epsilon: self.epsilon,
            tie_candidates: self.tie_candidates,
        }
    }

    pub fn knn_config(&self) -> KnnConfig {
        KnnConfig {
            k: self.k,
            metric: self.distance_mode,
            index: self.index,
        }
    }
}
