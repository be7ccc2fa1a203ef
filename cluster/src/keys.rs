/// Format: `{prefix}:art:{article_id_20d}`
pub fn article_key(prefix: &str, article_id: u64) -> String {
    format!("{prefix}:art:{article_id:020}")
}

pub fn article_prefix(prefix: &str) -> String {
    format!("{prefix}:art:")
}

/// Format: `{prefix}:clu:{cluster_id_20d}`
pub fn cluster_key(prefix: &str, cluster_id: u64) -> String {
    format!("{prefix}:clu:{cluster_id:020}")
}

pub fn cluster_prefix(prefix: &str) -> String {
    format!("{prefix}:clu:")
}

/// Membership marker.
/// Format: `{prefix}:mem:{cluster_id_20d}:{article_id_20d}`
pub fn member_key(prefix: &str, cluster_id: u64, article_id: u64) -> String {
    format!("{prefix}:mem:{cluster_id:020}:{article_id:020}")
}

/// Format: `{prefix}:mem:{cluster_id_20d}:`
pub fn member_prefix(prefix: &str, cluster_id: u64) -> String {
    format!("{prefix}:mem:{cluster_id:020}:")
}

/// Last allocated cluster id.
pub fn cluster_seq_key(prefix: &str) -> String {
    format!("{prefix}:meta:cluster_seq")
}

/// Decode the article id at the end of a membership key.
pub fn parse_member_key(key: &str) -> Option<u64> {
    key.rsplit(':').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_key_round_trip() {
        let k = member_key("news", 3, 12345);
        assert!(k.starts_with(&member_prefix("news", 3)));
        assert_eq!(parse_member_key(&k), Some(12345));
    }

    #[test]
    fn member_prefix_does_not_overlap() {
        // Cluster 1 must not scan cluster 10's members.
        assert!(!member_key("news", 10, 1).starts_with(&member_prefix("news", 1)));
    }
}
