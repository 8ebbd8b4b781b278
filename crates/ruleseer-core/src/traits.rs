use crate::error::Result;

/// Maps text to fixed-length, L2-normalized vectors.
///
/// Implementations are pure per item: the vector for a text never depends on
/// the other texts in the same call, so `embed_batch(&[t])[0] == embed(t)`.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model behind this embedder (e.g. `bert:all-MiniLM-L6-v2:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// One vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors.pop().ok_or_else(|| {
            crate::error::Error::Embedding(anyhow::anyhow!("embedder returned no vector for a single input"))
        })
    }
}
