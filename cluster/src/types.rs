use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::SimilarityStats;

/// Article is owned by the surrounding pipeline. The engine only writes
/// `cluster_id` and `category`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "id")]
    pub id: u64,

    #[serde(rename = "title")]
    pub title: String,

    #[serde(rename = "source")]
    pub source: String,

    #[serde(rename = "extracted_at")]
    pub extracted_at: DateTime<Utc>,

    #[serde(rename = "category", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(rename = "cluster_id", default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<u64>,
}

impl Article {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        source: impl Into<String>,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            source: source.into(),
            extracted_at,
            category: None,
            cluster_id: None,
        }
    }
}

/// Cluster groups near-duplicate articles around the article that founded it.
///
/// `similarity_mean`, `similarity_m2` and `similarity_samples` are Welford
/// accumulator state over the similarities of non-centroid members, so
/// `similarity_samples == article_count - 1` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(rename = "id")]
    pub id: u64,

    #[serde(rename = "run_date")]
    pub run_date: NaiveDate,

    /// Fixed at creation.
    #[serde(rename = "centroid")]
    pub centroid_article_id: u64,

    #[serde(rename = "count")]
    pub article_count: u64,

    #[serde(rename = "sim_mean")]
    pub similarity_mean: f64,

    #[serde(rename = "sim_m2")]
    pub similarity_m2: f64,

    #[serde(rename = "sim_n")]
    pub similarity_samples: u64,

    #[serde(rename = "last_assigned_at")]
    pub last_assigned_at: DateTime<Utc>,
}

impl Cluster {
    /// A fresh cluster holding only its centroid.
    pub fn seed(id: u64, run_date: NaiveDate, centroid_article_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            run_date,
            centroid_article_id,
            article_count: 1,
            similarity_mean: 0.0,
            similarity_m2: 0.0,
            similarity_samples: 0,
            last_assigned_at: now,
        }
    }

    /// The accumulator state as a [`SimilarityStats`].
    pub fn stats(&self) -> SimilarityStats {
        SimilarityStats {
            samples: self.similarity_samples,
            mean: self.similarity_mean,
            m2: self.similarity_m2,
        }
    }

    /// Return the cluster after one more article joined with `similarity`.
    pub fn joined(&self, similarity: f64, now: DateTime<Utc>) -> Self {
        let stats = self.stats().with(similarity);
        Self {
            article_count: self.article_count + 1,
            similarity_mean: stats.mean,
            similarity_m2: stats.m2,
            similarity_samples: stats.samples,
            last_assigned_at: now,
            ..self.clone()
        }
    }
}

/// Result of assigning one article.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assignment {
    /// The article joined an existing cluster with the given similarity.
    Joined { cluster_id: u64, similarity: f32 },
    /// No cluster was close enough; the article founded a new one.
    Founded { cluster_id: u64 },
    /// The article already belonged to a cluster; nothing changed.
    Unchanged { cluster_id: u64 },
}

impl Assignment {
    pub fn cluster_id(&self) -> u64 {
        match *self {
            Assignment::Joined { cluster_id, .. }
            | Assignment::Founded { cluster_id }
            | Assignment::Unchanged { cluster_id } => cluster_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn seed_has_one_member_and_no_samples() {
        let c = Cluster::seed(1, now().date_naive(), 42, now());
        assert_eq!(c.article_count, 1);
        assert_eq!(c.similarity_samples, 0);
        assert_eq!(c.centroid_article_id, 42);
    }

    #[test]
    fn joined_keeps_sample_invariant() {
        let c = Cluster::seed(1, now().date_naive(), 42, now())
            .joined(0.9, now())
            .joined(0.8, now());
        assert_eq!(c.article_count, 3);
        assert_eq!(c.similarity_samples, c.article_count - 1);
        assert!((c.similarity_mean - 0.85).abs() < 1e-12);
        assert_eq!(c.centroid_article_id, 42);
    }

    #[test]
    fn records_round_trip_msgpack() {
        let mut a = Article::new(7, "Title", "wire", now());
        a.cluster_id = Some(3);
        let data = rmp_serde::to_vec_named(&a).unwrap();
        let back: Article = rmp_serde::from_slice(&data).unwrap();
        assert_eq!(a, back);

        let plain = Article::new(8, "Other", "wire", now());
        let data = rmp_serde::to_vec_named(&plain).unwrap();
        let back: Article = rmp_serde::from_slice(&data).unwrap();
        assert_eq!(back.category, None);
        assert_eq!(back.cluster_id, None);
    }
}
