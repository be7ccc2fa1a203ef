/// Build the KV key of an embedding log entry.
/// Format: `{prefix}:emb:{seq_20d}`
///
/// The sequence is zero-padded to 20 decimal digits for stable lexicographic
/// ordering in KV scans.
pub fn embedding_key(prefix: &str, seq: u64) -> String {
    format!("{prefix}:emb:{seq:020}")
}

/// Return the KV prefix for scanning the embedding log.
/// Format: `{prefix}:emb:`
pub fn embedding_prefix(prefix: &str) -> String {
    format!("{prefix}:emb:")
}

/// Return the KV key of the article-id reverse index.
/// Format: `{prefix}:eid:{article_id_20d}`
pub fn embedding_id_key(prefix: &str, article_id: u64) -> String {
    format!("{prefix}:eid:{article_id:020}")
}

/// Return the KV key of the last allocated embedding sequence.
pub fn embedding_seq_key(prefix: &str) -> String {
    format!("{prefix}:meta:emb_seq")
}

/// Parse a decimal u64 stored as UTF-8.
pub fn parse_u64(data: &[u8]) -> Result<u64, String> {
    let s = std::str::from_utf8(data).map_err(|e| e.to_string())?;
    s.parse::<u64>().map_err(|e| e.to_string())
}
