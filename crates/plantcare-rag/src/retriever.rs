//! Read path: species name (and optional question) to grounding documents.
use std::sync::Arc;

use plantcare_core::config::RagSettings;
use plantcare_core::traits::DocumentStore;
use plantcare_core::{CareDocument, Result};

#[derive(Debug, Clone, Copy)]
pub struct RetrieverOptions {
    /// Similarity hits kept for a species with no exact match.
    pub similar_limit: usize,
    /// Cap on documents returned when a question is supplied.
    pub question_limit: usize,
    /// Also search by the question text and merge the hits.
    pub search_question: bool,
}

impl Default for RetrieverOptions {
    fn default() -> Self { Self::from(&RagSettings::default()) }
}

impl From<&RagSettings> for RetrieverOptions {
    fn from(s: &RagSettings) -> Self {
        Self { similar_limit: s.similar_limit.max(1), question_limit: s.question_limit.max(1), search_question: s.search_question }
    }
}

pub struct Retriever {
    store: Arc<dyn DocumentStore>,
    options: RetrieverOptions,
}

impl Retriever {
    pub fn new(store: Arc<dyn DocumentStore>, options: RetrieverOptions) -> Self { Self { store, options } }

    /// Exact species match first, always; otherwise similarity hits. With a
    /// question, hits for the question text are merged in, one document per
    /// species.
    pub fn retrieve(&self, species: &str, question: Option<&str>) -> Result<Vec<CareDocument>> {
        let question = question.map(str::trim).filter(|q| !q.is_empty());
        let mut docs: Vec<CareDocument> = Vec::new();

        if let Some(doc) = self.store.find_exact(species)? {
            tracing::debug!(species, id = %doc.id, "exact species match");
            docs.push(doc);
        } else {
            let limit = if question.is_some() { self.options.question_limit } else { self.options.similar_limit };
            for hit in self.store.find_similar(species, limit)? {
                tracing::debug!(species, matched = %hit.document.species, score = hit.score, "similar species match");
                push_unique(&mut docs, hit.document);
            }
        }

        if let Some(q) = question {
            if self.options.search_question {
                for hit in self.store.find_similar(q, self.options.question_limit)? { push_unique(&mut docs, hit.document); }
            }
            docs.truncate(self.options.question_limit);
        }
        Ok(docs)
    }
}

fn push_unique(docs: &mut Vec<CareDocument>, doc: CareDocument) {
    let key = doc.key();
    if !docs.iter().any(|d| d.key() == key) { docs.push(doc); }
}
