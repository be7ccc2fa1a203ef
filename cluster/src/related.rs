use chrono::Duration;

use crate::error::ClusterError;
use crate::repo::ClusterRepo;

/// Articles in the same cluster as `article_id` whose extraction time lies
/// within `window_days` of its own, ordered by `(extracted_at, id)`.
///
/// The article itself is never included. An article that has not been
/// clustered yet has no related articles.
pub fn related(
    repo: &ClusterRepo,
    article_id: u64,
    window_days: u32,
) -> Result<Vec<u64>, ClusterError> {
    let article = repo.require_article(article_id)?;
    let Some(cluster_id) = article.cluster_id else {
        return Ok(Vec::new());
    };

    let window = Duration::days(i64::from(window_days));
    let mut found = Vec::new();
    for member_id in repo.members(cluster_id)? {
        if member_id == article_id {
            continue;
        }
        let Some(member) = repo.article(member_id)? else {
            continue;
        };
        let delta = member.extracted_at - article.extracted_at;
        if delta <= window && delta >= -window {
            found.push((member.extracted_at, member.id));
        }
    }
    found.sort();
    Ok(found.into_iter().map(|(_, id)| id).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use newsdup_kv::MemoryStore;

    use super::*;
    use crate::types::{Article, Cluster};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn seeded() -> ClusterRepo {
        let repo = ClusterRepo::new(Arc::new(MemoryStore::new()), "t");
        let centroid = Article::new(1, "a", "s", at("2026-03-05T12:00:00Z"));
        repo.put_article(&centroid).unwrap();
        let mut cluster = Cluster::seed(1, centroid.extracted_at.date_naive(), 1, centroid.extracted_at);
        repo.commit_assignment(&centroid, &cluster, true).unwrap();

        for (id, ts) in [
            (2u64, "2026-03-04T12:00:00Z"),
            (3, "2026-03-02T12:00:00Z"),
            (4, "2026-03-06T11:00:00Z"),
            (5, "2026-03-04T12:00:00Z"),
        ] {
            let a = Article::new(id, "b", "s", at(ts));
            repo.put_article(&a).unwrap();
            cluster = cluster.joined(0.9, a.extracted_at);
            repo.commit_assignment(&a, &cluster, false).unwrap();
        }
        repo
    }

    #[test]
    fn filters_by_window_and_orders_by_time() {
        let repo = seeded();
        // Article 3 is three days away; 2 and 5 tie on time and order by id.
        assert_eq!(related(&repo, 1, 1).unwrap(), vec![2, 5, 4]);
        assert_eq!(related(&repo, 1, 3).unwrap(), vec![3, 2, 5, 4]);
    }

    #[test]
    fn window_bound_is_inclusive() {
        let repo = seeded();
        assert_eq!(related(&repo, 2, 0).unwrap(), vec![5]);
        assert_eq!(related(&repo, 3, 2).unwrap(), vec![2, 5]);
    }

    #[test]
    fn unclustered_and_unknown_articles() {
        let repo = seeded();
        repo.put_article(&Article::new(9, "c", "s", at("2026-03-05T12:00:00Z"))).unwrap();
        assert!(related(&repo, 9, 7).unwrap().is_empty());
        assert!(matches!(
            related(&repo, 99, 7).unwrap_err(),
            ClusterError::ArticleNotFound(99)
        ));
    }
}
