use thiserror::Error;

/// Errors reported by an [`Embedder`].
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embed: empty input")]
    EmptyInput,

    #[error("embed: API error: {0}")]
    Api(String),
}

/// The upstream model that turns article text into a fixed-length vector.
///
/// The engine never embeds on its own; [`crate::RunContext::ingest`] calls
/// the collaborator and checks the result against the configured dimension.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Embed several texts, returning vectors in input order. The default
    /// embeds them one at a time.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;
}
