//! In-process document store: exact lookup through a species-key map,
//! similarity through a brute-force cosine scan.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use plantcare_core::traits::{DocumentStore, Embedder};
use plantcare_core::{species_key, CareDocument, Error, QueryResult, Result};
use plantcare_embed::cosine;

use crate::{check_batch, embedding_text, rank};

struct Entry {
    doc: CareDocument,
    vector: Vec<f32>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
    ids: HashSet<String>,
}

pub struct MemoryStore {
    embedder: Arc<dyn Embedder>,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder, inner: RwLock::new(Inner::default()) }
    }
}

impl DocumentStore for MemoryStore {
    fn add(&self, documents: &[CareDocument]) -> Result<()> {
        if documents.is_empty() { return Ok(()); }
        let texts: Vec<String> = documents.iter().map(embedding_text).collect();
        let vectors = self.embedder.embed_batch(&texts).map_err(|e| Error::StoreWrite(format!("embedding failed: {e}")))?;
        if vectors.len() != documents.len() {
            return Err(Error::StoreWrite(format!("embedder returned {} vectors for {} documents", vectors.len(), documents.len())));
        }
        let mut inner = self.inner.write().map_err(|_| Error::StoreWrite("store lock poisoned".into()))?;
        check_batch(documents, |id| inner.ids.contains(id))?;
        for (doc, vector) in documents.iter().zip(vectors) {
            let idx = inner.entries.len();
            inner.by_key.entry(doc.key()).or_insert(idx);
            inner.ids.insert(doc.id.clone());
            inner.entries.push(Entry { doc: doc.clone(), vector });
        }
        tracing::debug!(added = documents.len(), total = inner.entries.len(), "memory store write");
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let inner = self.inner.read().map_err(|_| Error::StoreRead("store lock poisoned".into()))?;
        Ok(inner.entries.len())
    }

    fn find_exact(&self, species: &str) -> Result<Option<CareDocument>> {
        let key = species_key(species);
        if key.is_empty() { return Ok(None); }
        let inner = self.inner.read().map_err(|_| Error::StoreRead("store lock poisoned".into()))?;
        Ok(inner.by_key.get(&key).map(|&i| inner.entries[i].doc.clone()))
    }

    fn find_similar(&self, query: &str, limit: usize) -> Result<Vec<QueryResult>> {
        if limit == 0 { return Err(Error::StoreRead("similarity limit must be at least 1".into())); }
        let inner = self.inner.read().map_err(|_| Error::StoreRead("store lock poisoned".into()))?;
        if inner.entries.is_empty() { return Ok(vec![]); }
        let q = self.embedder.embed_one(query).map_err(|e| Error::StoreRead(format!("query embedding failed: {e}")))?;
        if q.iter().all(|x| *x == 0.0) { return Ok(vec![]); }
        let scored = inner.entries.iter().map(|e| QueryResult::new(e.doc.clone(), cosine(&q, &e.vector))).collect();
        Ok(rank(scored, limit))
    }
}
