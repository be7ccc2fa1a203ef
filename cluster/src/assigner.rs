use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use newsdup_store::EmbeddingStore;
use newsdup_vecindex::VecIndex;
use tracing::{debug, info};

use crate::error::ClusterError;
use crate::repo::ClusterRepo;
use crate::types::{Article, Assignment, Cluster};

/// Controls assigner behavior.
#[derive(Debug, Clone)]
pub struct AssignerConfig {
    /// Embedding dimension.
    pub dim: usize,

    /// Minimum similarity to the nearest centroid for an article to join
    /// its cluster. Cosine similarity for cosine indexes.
    pub similarity_threshold: f32,

    /// Clusters whose similarity is within `epsilon` of the best one are
    /// tied; the lowest cluster id wins.
    pub epsilon: f32,

    /// Number of nearest centroids fetched per lookup. The lookup doubles
    /// while every fetched centroid is still inside the tie band.
    pub tie_candidates: usize,
}

/// Outcome of the index lookup for one embedding, before anything is written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Join { cluster_id: u64, similarity: f32 },
    Found,
}

/// Assigns articles to clusters by nearest fixed centroid.
///
/// The centroid index holds one vector per cluster, keyed by cluster id.
/// Methods that change state take `&mut self`; callers serialize
/// assignment by owning the assigner behind a single lock.
pub struct Assigner {
    cfg: AssignerConfig,
    repo: ClusterRepo,
    index: Box<dyn VecIndex>,
    clusters: BTreeMap<u64, Cluster>,
    run_date: NaiveDate,
}

impl fmt::Debug for Assigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assigner")
            .field("run_date", &self.run_date)
            .field("clusters", &self.clusters.len())
            .field("metric", &self.index.metric())
            .finish()
    }
}

impl Assigner {
    /// Creates an assigner over an empty centroid index.
    /// Panics if `cfg.dim` is 0 or differs from the index dimension.
    pub fn new(
        cfg: AssignerConfig,
        repo: ClusterRepo,
        index: Box<dyn VecIndex>,
        run_date: NaiveDate,
    ) -> Self {
        assert!(cfg.dim > 0, "cluster: AssignerConfig.dim must be positive");
        assert_eq!(cfg.dim, index.dim(), "cluster: index dimension differs from config");
        Self {
            cfg,
            repo,
            index,
            clusters: BTreeMap::new(),
            run_date,
        }
    }

    /// Load the clusters with run dates in `[from, run_date]` and index their
    /// centroids, in embedding creation order. Returns the number of clusters.
    pub fn warm(&mut self, store: &EmbeddingStore, from: NaiveDate) -> Result<usize, ClusterError> {
        let clusters = self.repo.clusters_between(from, self.run_date)?;
        let by_centroid: HashMap<u64, u64> = clusters
            .iter()
            .map(|c| (c.centroid_article_id, c.id))
            .collect();

        for item in store.load_all() {
            let (article_id, vector) = item?;
            if let Some(&cluster_id) = by_centroid.get(&article_id) {
                if !self.index.contains(cluster_id) {
                    self.index.add(cluster_id, &vector)?;
                }
            }
        }

        for c in &clusters {
            if !self.index.contains(c.id) {
                return Err(ClusterError::MissingCentroid {
                    cluster_id: c.id,
                    article_id: c.centroid_article_id,
                });
            }
        }

        let n = clusters.len();
        self.clusters = clusters.into_iter().map(|c| (c.id, c)).collect();
        info!(clusters = n, from = %from, to = %self.run_date, "warmed centroid index");
        Ok(n)
    }

    /// Look up where `embedding` would go without changing anything.
    pub fn decide(&self, embedding: &[f32]) -> Result<Decision, ClusterError> {
        self.check_dim(embedding)?;
        let metric = self.index.metric();
        // Reject vectors the index would refuse before anything is committed.
        metric.prepare(embedding)?;

        let total = self.index.len();
        let mut k = self.cfg.tie_candidates.max(1).min(total.max(1));
        let (neighbors, best) = loop {
            let neighbors = self.index.query(embedding, k)?;
            let best = match neighbors.first() {
                Some(n) => metric.similarity(n.score),
                None => return Ok(Decision::Found),
            };
            if best < self.cfg.similarity_threshold {
                return Ok(Decision::Found);
            }
            // Widen until the last neighbor falls outside the tie band.
            let band_open = neighbors
                .last()
                .is_some_and(|n| best - metric.similarity(n.score) <= self.cfg.epsilon);
            if !band_open || neighbors.len() < k || k >= total {
                break (neighbors, best);
            }
            k = k.saturating_mul(2).min(total);
        };

        let chosen = neighbors
            .iter()
            .map(|n| (n.id, metric.similarity(n.score)))
            .filter(|&(_, s)| best - s <= self.cfg.epsilon)
            .min_by_key(|&(id, _)| id);
        Ok(match chosen {
            Some((cluster_id, similarity)) => Decision::Join {
                cluster_id,
                similarity,
            },
            None => Decision::Found,
        })
    }

    /// Assign `article` using its `embedding`.
    ///
    /// The article record, the cluster aggregate and the membership marker
    /// are committed in one batch before any in-memory state changes; if the
    /// commit fails the article stays unassigned and the call can be retried.
    /// An article that already has a cluster is left untouched.
    pub fn assign(
        &mut self,
        article: &Article,
        embedding: &[f32],
        now: DateTime<Utc>,
    ) -> Result<Assignment, ClusterError> {
        if let Some(cluster_id) = article.cluster_id {
            return Ok(Assignment::Unchanged { cluster_id });
        }

        match self.decide(embedding)? {
            Decision::Join {
                cluster_id,
                similarity,
            } => {
                let current = self
                    .clusters
                    .get(&cluster_id)
                    .ok_or_else(|| ClusterError::Index(format!("unknown cluster {cluster_id}")))?;
                let updated = current.joined(similarity as f64, now);
                self.repo.commit_assignment(article, &updated, false)?;

                debug!(
                    article_id = article.id,
                    cluster_id,
                    similarity,
                    count = updated.article_count,
                    "article joined cluster"
                );
                self.clusters.insert(cluster_id, updated);
                Ok(Assignment::Joined {
                    cluster_id,
                    similarity,
                })
            }
            Decision::Found => {
                let cluster_id = self.repo.next_cluster_id()?;
                let cluster = Cluster::seed(cluster_id, self.run_date, article.id, now);
                self.repo.commit_assignment(article, &cluster, true)?;
                self.index.add(cluster_id, embedding)?;

                info!(article_id = article.id, cluster_id, "founded cluster");
                self.clusters.insert(cluster_id, cluster);
                Ok(Assignment::Founded { cluster_id })
            }
        }
    }

    /// A cluster known to this assigner.
    pub fn cluster(&self, cluster_id: u64) -> Option<&Cluster> {
        self.clusters.get(&cluster_id)
    }

    /// All clusters known to this assigner, by id.
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    fn check_dim(&self, embedding: &[f32]) -> Result<(), ClusterError> {
        if embedding.len() != self.cfg.dim {
            return Err(ClusterError::DimensionMismatch {
                expected: self.cfg.dim,
                got: embedding.len(),
            });
        }
        Ok(())
    }
}
