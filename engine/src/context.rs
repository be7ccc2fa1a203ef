use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use newsdup_cluster::{Article, Assigner, Assignment, Cluster, ClusterError, ClusterRepo};
use newsdup_kv::KVStore;
use newsdup_knn::{Evaluation, KnnClassifier, Prediction};
use newsdup_store::{EmbeddingStore, Put};
use newsdup_vecindex::build_index;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::embedder::{EmbedError, Embedder};
use crate::error::EngineError;

/// Settings that must not change once data has been written under a prefix.
#[derive(Debug, Serialize, Deserialize)]
struct EngineMeta {
    dim: usize,
    distance_mode: String,
}

fn meta_key(prefix: &str) -> String {
    format!("{prefix}:meta:engine")
}

/// RunContext owns the state of one pipeline run.
///
/// [`RunContext::open`] validates the configuration and warm-loads the
/// clusters of the run's lookback window; [`RunContext::close`] tears the
/// in-memory state down.
///
/// Every write goes through the assigner lock: the stores below read a
/// record and write it back, so they need a single writer. The classifier
/// is read-shared once fitted.
pub struct RunContext {
    cfg: EngineConfig,
    run_date: NaiveDate,
    store: EmbeddingStore,
    repo: ClusterRepo,
    assigner: Mutex<Assigner>,
    classifier: RwLock<KnnClassifier>,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_date", &self.run_date)
            .field("prefix", &self.cfg.prefix)
            .finish()
    }
}

impl RunContext {
    /// Open a run over `kv` for `run_date`.
    pub fn open(
        cfg: EngineConfig,
        kv: Arc<dyn KVStore>,
        run_date: NaiveDate,
    ) -> Result<Self, EngineError> {
        cfg.validate()?;
        check_meta(kv.as_ref(), &cfg)?;

        let dim = cfg.embedding_dimension;
        let store = EmbeddingStore::new(kv.clone(), cfg.prefix.clone(), dim);
        let repo = ClusterRepo::new(kv, cfg.prefix.clone());

        let mut assigner = Assigner::new(
            cfg.assigner_config(),
            repo.clone(),
            build_index(cfg.index, cfg.distance_mode, dim),
            run_date,
        );
        let from = run_date
            .checked_sub_days(Days::new(u64::from(cfg.lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        let warmed = assigner.warm(&store, from)?;

        info!(
            run_date = %run_date,
            clusters = warmed,
            dim,
            metric = ?cfg.distance_mode,
            "opened run context"
        );
        Ok(Self {
            classifier: RwLock::new(KnnClassifier::new(cfg.knn_config())),
            cfg,
            run_date,
            store,
            repo,
            assigner: Mutex::new(assigner),
        })
    }

    /// Release the run's in-memory state.
    pub fn close(self) {
        let clusters = self.assigner.lock().len();
        info!(run_date = %self.run_date, clusters, "closed run context");
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    pub fn put_article(&self, article: &Article) -> Result<(), EngineError> {
        let _writer = self.assigner.lock();
        self.repo.put_article(article)?;
        Ok(())
    }

    /// Persist the embedding of `article_id`.
    ///
    /// Vectors the configured distance cannot score (a zero vector under
    /// cosine) are rejected before anything is written.
    pub fn put_embedding(&self, article_id: u64, vector: &[f32]) -> Result<Put, EngineError> {
        let _writer = self.assigner.lock();
        self.put_embedding_locked(article_id, vector)
    }

    fn put_embedding_locked(&self, article_id: u64, vector: &[f32]) -> Result<Put, EngineError> {
        self.cfg
            .distance_mode
            .prepare(vector)
            .map_err(|source| EngineError::InvalidEmbedding { article_id, source })?;
        Ok(self.store.put(article_id, vector)?)
    }

    pub fn article(&self, article_id: u64) -> Result<Option<Article>, EngineError> {
        Ok(self.repo.article(article_id)?)
    }

    /// A persisted cluster, whether or not it is in this run's window.
    pub fn cluster(&self, cluster_id: u64) -> Result<Option<Cluster>, EngineError> {
        Ok(self.repo.cluster(cluster_id)?)
    }

    /// Clusters open for assignment in this run, by id.
    pub fn clusters(&self) -> Vec<Cluster> {
        self.assigner.lock().clusters().cloned().collect()
    }

    /// Embed the title of `article` and persist it with its embedding.
    ///
    /// The embedding is written first, so an article is never stored without
    /// one.
    pub async fn ingest(
        &self,
        article: &Article,
        embedder: &dyn Embedder,
    ) -> Result<Put, EngineError> {
        self.check_embedder(embedder)?;
        let vector = embedder.embed(&article.title).await?;
        self.persist(article, &vector)
    }

    /// Like [`RunContext::ingest`] for several articles, embedding their
    /// titles in one call. Stops at the first article that fails to persist.
    pub async fn ingest_batch(
        &self,
        articles: &[Article],
        embedder: &dyn Embedder,
    ) -> Result<Vec<Put>, EngineError> {
        self.check_embedder(embedder)?;
        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        let vectors = embedder.embed_batch(&titles).await?;
        if vectors.len() != articles.len() {
            return Err(EmbedError::Api(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                articles.len()
            ))
            .into());
        }

        let mut out = Vec::with_capacity(articles.len());
        for (article, vector) in articles.iter().zip(&vectors) {
            out.push(self.persist(article, vector)?);
        }
        info!(count = out.len(), "ingested articles");
        Ok(out)
    }

    fn check_embedder(&self, embedder: &dyn Embedder) -> Result<(), EngineError> {
        let got = embedder.dimension();
        if got != self.cfg.embedding_dimension {
            return Err(EngineError::EmbedderDimension {
                configured: self.cfg.embedding_dimension,
                embedder: got,
            });
        }
        Ok(())
    }

    fn persist(&self, article: &Article, vector: &[f32]) -> Result<Put, EngineError> {
        let _writer = self.assigner.lock();
        let put = self.put_embedding_locked(article.id, vector)?;
        self.repo.put_article(article)?;
        Ok(put)
    }

    /// Assign a stored article to a cluster and return the cluster id.
    pub fn assign_cluster(&self, article_id: u64) -> Result<u64, EngineError> {
        Ok(self.assign_cluster_at(article_id, Utc::now())?.cluster_id())
    }

    /// Like [`RunContext::assign_cluster`] with an explicit assignment time.
    pub fn assign_cluster_at(
        &self,
        article_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Assignment, EngineError> {
        let mut assigner = self.assigner.lock();
        let article = self.repo.require_article(article_id)?;
        if let Some(cluster_id) = article.cluster_id {
            return Ok(Assignment::Unchanged { cluster_id });
        }
        let embedding = self.store.get(article_id)?;
        Ok(assigner.assign(&article, &embedding, now)?)
    }

    /// Assign every unassigned article that has an embedding, in embedding
    /// creation order.
    ///
    /// An article whose embedding cannot be assigned is logged and left
    /// unassigned; storage failures abort the pass.
    pub fn assign_pending(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(u64, Assignment)>, EngineError> {
        let mut assigner = self.assigner.lock();
        let mut pending: HashSet<u64> = self
            .repo
            .articles()?
            .into_iter()
            .filter(|a| a.cluster_id.is_none())
            .map(|a| a.id)
            .collect();
        let waiting = pending.len();

        let mut out = Vec::new();
        let mut skipped = 0usize;
        for item in self.store.load_all() {
            let (article_id, embedding) = item?;
            if !pending.remove(&article_id) {
                continue;
            }
            let article = self.repo.require_article(article_id)?;
            match assigner.assign(&article, &embedding, now) {
                Ok(assignment) => out.push((article_id, assignment)),
                Err(e @ (ClusterError::Index(_) | ClusterError::DimensionMismatch { .. })) => {
                    warn!(article_id, error = %e, "skipped unassignable embedding");
                    skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        if !pending.is_empty() {
            warn!(count = pending.len(), "articles without embeddings left unassigned");
        }
        info!(waiting, assigned = out.len(), skipped, "assigned pending articles");
        Ok(out)
    }

    /// Articles of the same cluster extracted within `window_days` of
    /// `article_id`, ordered by extraction time.
    pub fn get_related(&self, article_id: u64, window_days: u32) -> Result<Vec<u64>, EngineError> {
        Ok(newsdup_cluster::related(&self.repo, article_id, window_days)?)
    }

    /// Record the category of an article.
    pub fn store_category(&self, article_id: u64, category: &str) -> Result<(), EngineError> {
        let _writer = self.assigner.lock();
        self.repo.set_category(article_id, category)?;
        Ok(())
    }

    /// Ids of every categorized article that has an embedding, by id.
    pub fn labeled_articles(&self) -> Result<Vec<u64>, EngineError> {
        let mut ids = Vec::new();
        for article in self.repo.articles()? {
            if article.category.is_some() && self.store.contains(article.id)? {
                ids.push(article.id);
            }
        }
        Ok(ids)
    }

    /// Fit the classifier on every categorized article that has an embedding.
    /// Returns the number of training rows.
    pub fn fit_classifier(&self) -> Result<usize, EngineError> {
        let ids = self.labeled_articles()?;
        self.fit_classifier_on(&ids)
    }

    /// Fit the classifier on the given articles only. Each must have a
    /// category and an embedding.
    pub fn fit_classifier_on(&self, article_ids: &[u64]) -> Result<usize, EngineError> {
        let (rows, labels) = self.labeled_rows(article_ids)?;
        self.classifier.write().fit(&rows, &labels)?;
        Ok(rows.len())
    }

    /// Classify a stored article with the configured k.
    pub fn classify(&self, article_id: u64) -> Result<Prediction, EngineError> {
        let embedding = self.store.get(article_id)?;
        Ok(self.classifier.read().classify(&embedding, self.cfg.k)?)
    }

    pub fn classify_batch(&self, article_ids: &[u64]) -> Result<Vec<Prediction>, EngineError> {
        let rows = article_ids
            .iter()
            .map(|&id| self.store.get(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.classifier.read().classify_batch(&rows, self.cfg.k)?)
    }

    /// Score the classifier on articles whose stored category is the truth.
    pub fn evaluate(&self, test_set: &[u64]) -> Result<Evaluation, EngineError> {
        let (rows, labels) = self.labeled_rows(test_set)?;
        Ok(self.classifier.read().evaluate(&rows, &labels)?)
    }

    fn labeled_rows(&self, article_ids: &[u64]) -> Result<(Vec<Vec<f32>>, Vec<String>), EngineError> {
        let mut rows = Vec::with_capacity(article_ids.len());
        let mut labels = Vec::with_capacity(article_ids.len());
        for &id in article_ids {
            let article = self.repo.require_article(id)?;
            let category = article.category.ok_or(EngineError::Unlabeled(id))?;
            rows.push(self.store.get(id)?);
            labels.push(category);
        }
        Ok((rows, labels))
    }
}

/// Record the dimension and distance mode on first open and refuse to reopen
/// the same prefix with different ones.
fn check_meta(kv: &dyn KVStore, cfg: &EngineConfig) -> Result<(), EngineError> {
    let key = meta_key(&cfg.prefix);
    let current = EngineMeta {
        dim: cfg.embedding_dimension,
        distance_mode: format!("{:?}", cfg.distance_mode).to_lowercase(),
    };

    match kv.get(&key)? {
        None => {
            let data = serde_json::to_vec(&current)
                .map_err(|e| EngineError::Serialization(e.to_string()))?;
            kv.set(&key, &data)?;
            Ok(())
        }
        Some(data) => {
            let stored: EngineMeta = serde_json::from_slice(&data)
                .map_err(|e| EngineError::Serialization(e.to_string()))?;
            if stored.dim != current.dim {
                return Err(EngineError::MetaMismatch {
                    field: "embedding_dimension",
                    stored: stored.dim.to_string(),
                    current: current.dim.to_string(),
                });
            }
            if stored.distance_mode != current.distance_mode {
                return Err(EngineError::MetaMismatch {
                    field: "distance_mode",
                    stored: stored.distance_mode,
                    current: current.distance_mode,
                });
            }
            Ok(())
        }
    }
}
