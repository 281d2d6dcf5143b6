//! plantcare-store
//!
//! Document Store backends for the plant-care knowledge base: an in-process
//! cosine index (`MemoryStore`) and a LanceDB table (`LanceStore`). Both
//! implement `plantcare_core::traits::DocumentStore` and report cosine
//! similarity as the score, higher is closer.
use std::collections::HashSet;
use std::sync::Arc;

use plantcare_core::config::{StoreBackend, StoreSettings};
use plantcare_core::traits::{DocumentStore, Embedder};
use plantcare_core::{CareDocument, Error, QueryResult, Result};

pub mod lance;
pub mod memory;
pub mod schema;

pub use lance::LanceStore;
pub use memory::MemoryStore;

/// Open the backend named in settings.
pub fn open_store(settings: &StoreSettings, embedder: Arc<dyn Embedder>) -> Result<Arc<dyn DocumentStore>> {
    match settings.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new(embedder))),
        StoreBackend::Lancedb => {
            let path = settings.lancedb_path();
            std::fs::create_dir_all(&path).map_err(|e| Error::StoreWrite(format!("cannot create {}: {}", path.display(), e)))?;
            Ok(Arc::new(LanceStore::open(&path, &settings.table, embedder)?))
        }
    }
}

/// Text a document is embedded from; the species name leads so that
/// species-name queries land on the right document.
pub(crate) fn embedding_text(doc: &CareDocument) -> String {
    format!("{}. {}", doc.species, doc.text)
}

/// Validate a write batch: every document well-formed, ids unique within
/// the batch and not already stored.
pub(crate) fn check_batch(documents: &[CareDocument], exists: impl Fn(&str) -> bool) -> Result<()> {
    let mut seen = HashSet::new();
    for doc in documents {
        doc.validate()?;
        if !seen.insert(doc.id.as_str()) || exists(&doc.id) {
            return Err(Error::StoreWrite(format!("duplicate document id '{}'", doc.id)));
        }
    }
    Ok(())
}

/// Best first; stable, so equal scores keep insertion order.
pub(crate) fn rank(mut hits: Vec<QueryResult>, limit: usize) -> Vec<QueryResult> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    hits
}
