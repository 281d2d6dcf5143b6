use crate::error::Result;
use crate::types::{CareDocument, CollectionStats, QueryResult};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Queryable collection of care documents.
///
/// Scores returned by `find_similar` are cosine similarities, best first.
pub trait DocumentStore: Send + Sync {
    fn add(&self, documents: &[CareDocument]) -> Result<()>;
    fn count(&self) -> Result<usize>;
    fn find_exact(&self, species: &str) -> Result<Option<CareDocument>>;
    fn find_similar(&self, query: &str, limit: usize) -> Result<Vec<QueryResult>>;

    fn stats(&self) -> Result<CollectionStats> {
        Ok(CollectionStats { total_documents: self.count()? })
    }
}
