//! plantcare-rag
//!
//! Retrieval-augmented plant-care tips: seed the knowledge base
//! (`loader`), pick grounding documents (`retriever`), prompt the model
//! (`composer`), and tie them together with per-call fallback to direct
//! generation (`tips`).
pub mod composer;
pub mod gemini;
pub mod loader;
pub mod model;
pub mod retriever;
pub mod tips;

pub use composer::ResponseComposer;
pub use gemini::GeminiClient;
pub use loader::KnowledgeLoader;
pub use model::{GenerationModel, ModelError};
pub use retriever::{Retriever, RetrieverOptions};
pub use tips::{shared_store, Comparison, Mode, TipsGenerator};
