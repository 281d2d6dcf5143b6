//! Seeds an empty store from the curated dataset, once.
use std::sync::{Mutex, PoisonError};

use plantcare_core::dataset::DatasetSource;
use plantcare_core::traits::DocumentStore;
use plantcare_core::{species_key, CareDocument, Result};
use std::collections::HashMap;

/// Serializes check-count-then-load across every loader in the process.
static LOAD_LOCK: Mutex<()> = Mutex::new(());

pub struct KnowledgeLoader {
    source: DatasetSource,
}

impl KnowledgeLoader {
    pub fn new(source: DatasetSource) -> Self { Self { source } }

    pub fn bundled() -> Self { Self::new(DatasetSource::Bundled) }

    pub fn source(&self) -> &DatasetSource { &self.source }

    /// Load the dataset into `store` if it holds no documents. Returns the
    /// number of documents added; 0 when the store was already populated.
    pub fn load_if_empty(&self, store: &dyn DocumentStore) -> Result<usize> {
        let _guard = LOAD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let existing = store.count()?;
        if existing > 0 {
            tracing::debug!(existing, "knowledge base already populated");
            return Ok(0);
        }
        let docs = self.documents()?;
        store.add(&docs)?;
        tracing::info!(added = docs.len(), source = %self.source.label(), "knowledge base loaded");
        Ok(docs.len())
    }

    /// Dataset records as store documents. Ids are `{slug}:{n}` with `n`
    /// counting records of the same species.
    pub fn documents(&self) -> Result<Vec<CareDocument>> {
        let records = self.source.read()?;
        let default_source = self.source.label();
        let mut seen: HashMap<String, usize> = HashMap::new();
        Ok(records
            .into_iter()
            .map(|r| {
                let slug = slug(&r.species);
                let n = seen.entry(slug.clone()).or_insert(0);
                let id = format!("{}:{}", slug, n);
                *n += 1;
                let source = r.source.unwrap_or_else(|| default_source.clone());
                CareDocument::new(id, &r.species, r.text.trim(), source, r.section)
            })
            .collect())
    }
}

fn slug(species: &str) -> String {
    species_key(species)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_stable_across_spelling_variants() {
        assert_eq!(slug("Monstera deliciosa"), "monstera-deliciosa");
        assert_eq!(slug("  monstera   DELICIOSA "), "monstera-deliciosa");
        assert_eq!(slug("Ficus 'Audrey'"), "ficus--audrey-");
    }

    #[test]
    fn bundled_documents_have_unique_ids() {
        let docs = KnowledgeLoader::bundled().documents().unwrap();
        let mut ids: Vec<_> = docs.iter().map(|d| d.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), docs.len());
        assert!(docs.iter().all(|d| d.metadata.source == "curated"));
    }
}
