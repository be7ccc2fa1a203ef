use std::sync::Arc;

use chrono::NaiveDate;
use newsdup_kv::{KVStore, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ClusterError;
use crate::keys::{
    article_key, article_prefix, cluster_key, cluster_prefix, cluster_seq_key, member_key,
    member_prefix, parse_member_key,
};
use crate::types::{Article, Cluster};

fn encode<T: Serialize>(v: &T) -> Result<Vec<u8>, ClusterError> {
    rmp_serde::to_vec_named(v).map_err(|e| ClusterError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, ClusterError> {
    rmp_serde::from_slice(data).map_err(|e| ClusterError::Serialization(e.to_string()))
}

/// ClusterRepo persists articles, clusters and cluster membership.
///
/// Article updates read the stored record and write it back; callers keep a
/// single writer per prefix.
#[derive(Clone)]
pub struct ClusterRepo {
    kv: Arc<dyn KVStore>,
    prefix: String,
}

impl ClusterRepo {
    pub fn new(kv: Arc<dyn KVStore>, prefix: impl Into<String>) -> Self {
        Self {
            kv,
            prefix: prefix.into(),
        }
    }

    /// Write an article as supplied by the pipeline.
    ///
    /// An existing `cluster_id` is kept: membership is only ever changed by
    /// [`ClusterRepo::commit_assignment`]. A missing category does not erase
    /// a stored one.
    pub fn put_article(&self, article: &Article) -> Result<(), ClusterError> {
        let mut article = article.clone();
        if let Some(existing) = self.article(article.id)? {
            article.cluster_id = existing.cluster_id;
            if article.category.is_none() {
                article.category = existing.category;
            }
        }
        self.kv
            .set(&article_key(&self.prefix, article.id), &encode(&article)?)?;
        Ok(())
    }

    pub fn article(&self, article_id: u64) -> Result<Option<Article>, ClusterError> {
        match self.kv.get(&article_key(&self.prefix, article_id))? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Like [`ClusterRepo::article`], failing when the article is unknown.
    pub fn require_article(&self, article_id: u64) -> Result<Article, ClusterError> {
        self.article(article_id)?
            .ok_or(ClusterError::ArticleNotFound(article_id))
    }

    /// Every stored article, ordered by id.
    pub fn articles(&self) -> Result<Vec<Article>, ClusterError> {
        self.kv
            .scan(&article_prefix(&self.prefix))?
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    /// Record the category of an article.
    pub fn set_category(&self, article_id: u64, category: &str) -> Result<(), ClusterError> {
        let mut article = self.require_article(article_id)?;
        article.category = Some(category.to_string());
        self.kv
            .set(&article_key(&self.prefix, article_id), &encode(&article)?)?;
        Ok(())
    }

    pub fn cluster(&self, cluster_id: u64) -> Result<Option<Cluster>, ClusterError> {
        match self.kv.get(&cluster_key(&self.prefix, cluster_id))? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Clusters whose run date lies in `[from, to]`, ordered by id.
    pub fn clusters_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Cluster>, ClusterError> {
        let mut out = Vec::new();
        for (_, v) in self.kv.scan(&cluster_prefix(&self.prefix))? {
            let c: Cluster = decode(&v)?;
            if c.run_date >= from && c.run_date <= to {
                out.push(c);
            }
        }
        Ok(out)
    }

    /// Article ids of every member of a cluster (centroid included), by id.
    pub fn members(&self, cluster_id: u64) -> Result<Vec<u64>, ClusterError> {
        Ok(self
            .kv
            .scan(&member_prefix(&self.prefix, cluster_id))?
            .iter()
            .filter_map(|(k, _)| parse_member_key(k))
            .collect())
    }

    /// The id the next founded cluster will receive.
    pub fn next_cluster_id(&self) -> Result<u64, ClusterError> {
        match self.kv.get(&cluster_seq_key(&self.prefix))? {
            Some(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| ClusterError::Serialization(e.to_string()))?;
                let last: u64 = text
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ClusterError::Serialization(e.to_string()))?;
                Ok(last + 1)
            }
            None => Ok(1),
        }
    }

    /// Atomically record that `article` now belongs to `cluster`.
    ///
    /// Writes the article (with its `cluster_id`), the cluster aggregate and
    /// the membership marker in one batch. When `founded` is set, the
    /// cluster id counter advances in the same batch.
    pub fn commit_assignment(
        &self,
        article: &Article,
        cluster: &Cluster,
        founded: bool,
    ) -> Result<(), ClusterError> {
        let mut article = article.clone();
        article.cluster_id = Some(cluster.id);

        let mut batch = WriteBatch::new();
        batch
            .set(article_key(&self.prefix, article.id), encode(&article)?)
            .set(cluster_key(&self.prefix, cluster.id), encode(cluster)?)
            .set(member_key(&self.prefix, cluster.id, article.id), Vec::<u8>::new());
        if founded {
            batch.set(cluster_seq_key(&self.prefix), cluster.id.to_string().into_bytes());
        }
        self.kv.write(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use newsdup_kv::MemoryStore;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn repo() -> ClusterRepo {
        ClusterRepo::new(Arc::new(MemoryStore::new()), "t")
    }

    #[test]
    fn commit_writes_article_cluster_and_member() {
        let repo = repo();
        let now = at("2026-03-01T10:00:00Z");
        let article = Article::new(5, "Rates rise", "wire", now);
        repo.put_article(&article).unwrap();

        assert_eq!(repo.next_cluster_id().unwrap(), 1);
        let cluster = Cluster::seed(1, now.date_naive(), 5, now);
        repo.commit_assignment(&article, &cluster, true).unwrap();

        assert_eq!(repo.article(5).unwrap().unwrap().cluster_id, Some(1));
        assert_eq!(repo.cluster(1).unwrap().unwrap(), cluster);
        assert_eq!(repo.members(1).unwrap(), vec![5]);
        assert_eq!(repo.next_cluster_id().unwrap(), 2);
    }

    #[test]
    fn put_article_keeps_membership() {
        let repo = repo();
        let now = at("2026-03-01T10:00:00Z");
        let article = Article::new(5, "Rates rise", "wire", now);
        repo.put_article(&article).unwrap();
        repo.commit_assignment(&article, &Cluster::seed(1, now.date_naive(), 5, now), true)
            .unwrap();

        // Pipeline re-sends the article without cluster information.
        repo.put_article(&Article::new(5, "Rates rise again", "wire", now)).unwrap();
        let stored = repo.article(5).unwrap().unwrap();
        assert_eq!(stored.cluster_id, Some(1));
        assert_eq!(stored.title, "Rates rise again");
    }

    #[test]
    fn clusters_between_filters_by_run_date() {
        let repo = repo();
        for (id, day) in [(1u64, "2026-03-01"), (2, "2026-03-03"), (3, "2026-03-05")] {
            let now = at(&format!("{day}T00:00:00Z"));
            let a = Article::new(id * 100, "t", "s", now);
            repo.commit_assignment(&a, &Cluster::seed(id, now.date_naive(), a.id, now), true)
                .unwrap();
        }
        let from = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let ids: Vec<u64> = repo.clusters_between(from, to).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn set_category_requires_article() {
        let repo = repo();
        assert!(matches!(
            repo.set_category(1, "economia").unwrap_err(),
            ClusterError::ArticleNotFound(1)
        ));
        repo.put_article(&Article::new(1, "t", "s", at("2026-03-01T00:00:00Z"))).unwrap();
        repo.set_category(1, "economia").unwrap();
        assert_eq!(repo.article(1).unwrap().unwrap().category.as_deref(), Some("economia"));
    }
}
