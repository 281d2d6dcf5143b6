//! Domain types shared by the store, loader, retriever and composer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

pub type DocumentId = String;
pub type Meta = HashMap<String, String>;

/// Normalized lookup key for a species name: trimmed, inner whitespace
/// collapsed to single spaces, lowercased.
pub fn species_key(species: &str) -> String {
    species.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Descriptive metadata carried alongside a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub species: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

/// A unit of plant-care reference text stored in the knowledge base.
///
/// - `id`: unique within a store
/// - `species`: display form of the species name, trimmed
/// - `text`: the care text handed to the model verbatim
/// - `metadata`: species/source/section tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareDocument {
    pub id: DocumentId,
    pub species: String,
    pub text: String,
    pub metadata: DocumentMeta,
}

impl CareDocument {
    pub fn new(id: impl Into<String>, species: &str, text: impl Into<String>, source: impl Into<String>, section: Option<String>) -> Self {
        let species = species.trim().to_string();
        Self {
            id: id.into(),
            text: text.into(),
            metadata: DocumentMeta { species: species.clone(), source: source.into(), section },
            species,
        }
    }

    pub fn key(&self) -> String { species_key(&self.species) }

    /// Rejects documents a store must never hold.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() { return Err(Error::StoreWrite("document id is empty".into())); }
        if self.species.trim().is_empty() { return Err(Error::StoreWrite(format!("document '{}' has no species", self.id))); }
        if self.text.trim().is_empty() { return Err(Error::StoreWrite(format!("document '{}' has no text", self.id))); }
        Ok(())
    }

    /// Flattened metadata, keyed by field name.
    pub fn meta_map(&self) -> Meta {
        let mut m = Meta::new();
        m.insert("species".into(), self.metadata.species.clone());
        m.insert("source".into(), self.metadata.source.clone());
        if let Some(section) = &self.metadata.section { m.insert("section".into(), section.clone()); }
        m
    }
}

/// Document counts derived from the store on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_documents: usize,
}

/// A similarity hit. `score` is cosine similarity; higher is closer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub document: CareDocument,
    pub score: f32,
    pub metadata: Meta,
}

impl QueryResult {
    pub fn new(document: CareDocument, score: f32) -> Self {
        let metadata = document.meta_map();
        Self { document, score, metadata }
    }
}

/// Everything the composer needs to build a prompt.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub species: String,
    pub question: String,
    pub context: Vec<CareDocument>,
}

impl GenerationRequest {
    pub fn new(species: &str, question: Option<&str>, context: Vec<CareDocument>) -> Self {
        Self {
            species: species.trim().to_string(),
            question: question.map(str::trim).unwrap_or_default().to_string(),
            context,
        }
    }

    pub fn has_question(&self) -> bool { !self.question.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_key_ignores_case_and_spacing() {
        assert_eq!(species_key("  Monstera   Deliciosa \n"), "monstera deliciosa");
        assert_eq!(species_key("ALOE vera"), species_key("aloe VERA"));
        assert_eq!(species_key("   "), "");
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let ok = CareDocument::new("a:0", "Aloe vera", "Water sparingly.", "curated", None);
        assert!(ok.validate().is_ok());
        let no_species = CareDocument::new("a:1", "  ", "text", "curated", None);
        assert!(matches!(no_species.validate(), Err(Error::StoreWrite(_))));
        let no_text = CareDocument::new("a:2", "Aloe vera", " ", "curated", None);
        assert!(matches!(no_text.validate(), Err(Error::StoreWrite(_))));
    }

    #[test]
    fn request_trims_question() {
        let req = GenerationRequest::new(" Aloe vera ", Some("  "), vec![]);
        assert_eq!(req.species, "Aloe vera");
        assert!(!req.has_question());
    }
}
