//! Public entry point: RAG when the knowledge base is usable, direct
//! generation otherwise.
use std::sync::{Arc, Mutex, PoisonError};

use plantcare_core::config::{EmbedSettings, Settings, StoreSettings};
use plantcare_core::dataset::DatasetSource;
use plantcare_core::traits::DocumentStore;
use plantcare_core::{CareDocument, CollectionStats, Error, GenerationRequest, Result};
use plantcare_embed::embedder_from_settings;
use plantcare_store::open_store;

use crate::composer::ResponseComposer;
use crate::gemini::GeminiClient;
use crate::loader::KnowledgeLoader;
use crate::model::GenerationModel;
use crate::retriever::{Retriever, RetrieverOptions};

static SHARED_STORE: Mutex<Option<Arc<dyn DocumentStore>>> = Mutex::new(None);

/// Process-wide store, opened on first use. Later calls get the same
/// instance regardless of the settings they pass.
pub fn shared_store(store: &StoreSettings, embed: &EmbedSettings) -> Result<Arc<dyn DocumentStore>> {
    let mut slot = SHARED_STORE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(store) = slot.as_ref() { return Ok(Arc::clone(store)); }
    let embedder = embedder_from_settings(embed).map_err(|e| Error::StoreRead(format!("cannot create embedder: {e}")))?;
    let store = open_store(store, embedder)?;
    *slot = Some(Arc::clone(&store));
    Ok(store)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Rag,
    Direct,
}

struct RagPipeline {
    store: Arc<dyn DocumentStore>,
    retriever: Retriever,
}

/// Side-by-side answers for one species.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub context: Vec<CareDocument>,
    /// `None` in direct mode or when the RAG path failed.
    pub rag: Option<String>,
    pub direct: String,
}

pub struct TipsGenerator {
    composer: ResponseComposer,
    rag: Option<RagPipeline>,
}

impl TipsGenerator {
    /// Gemini client from the environment plus, when `rag.enabled`, the
    /// shared store seeded from the configured dataset. A missing API key
    /// fails construction in either mode.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let model: Arc<dyn GenerationModel> = Arc::new(GeminiClient::from_settings(&settings.model)?);
        if !settings.rag.enabled {
            tracing::info!("RAG disabled by configuration, using direct generation");
            return Ok(Self::direct(model));
        }
        let loader = KnowledgeLoader::new(DatasetSource::from_option(settings.data.dataset_path()));
        let options = RetrieverOptions::from(&settings.rag);
        match shared_store(&settings.store, &settings.embed) {
            Ok(store) => Ok(Self::with_store(model, store, &loader, options)),
            Err(e) => {
                tracing::warn!(error = %e, "document store unavailable, falling back to direct generation");
                Ok(Self::direct(model))
            }
        }
    }

    pub fn direct(model: Arc<dyn GenerationModel>) -> Self {
        Self { composer: ResponseComposer::new(model), rag: None }
    }

    /// RAG mode over `store`, seeding it through `loader` if it is empty.
    /// Any initialization failure is logged and yields direct mode.
    pub fn with_store(model: Arc<dyn GenerationModel>, store: Arc<dyn DocumentStore>, loader: &KnowledgeLoader, options: RetrieverOptions) -> Self {
        let composer = ResponseComposer::new(model);
        match loader.load_if_empty(store.as_ref()) {
            Ok(added) => {
                tracing::info!(added, model = composer.model_name(), "RAG enabled");
                Self { composer, rag: Some(RagPipeline { retriever: Retriever::new(Arc::clone(&store), options), store }) }
            }
            Err(e) => {
                tracing::warn!(error = %e, "RAG initialization failed, falling back to direct generation");
                Self { composer, rag: None }
            }
        }
    }

    pub fn mode(&self) -> Mode {
        if self.rag.is_some() { Mode::Rag } else { Mode::Direct }
    }

    /// Knowledge-base counts; `None` in direct mode.
    pub fn stats(&self) -> Result<Option<CollectionStats>> {
        self.rag.as_ref().map(|r| r.store.stats()).transpose()
    }

    /// Care tips for `species`, optionally answering `question`. Retrieval
    /// failures degrade this call to direct generation; only a failing model
    /// makes the call fail.
    pub fn generate_tips(&self, species: &str, question: Option<&str>) -> Result<String> {
        if let Some(rag) = &self.rag {
            match self.rag_answer(rag, species, question) {
                Ok((answer, _)) => return Ok(answer),
                Err(e) => log_rag_failure(species, &e),
            }
        }
        self.direct_answer(species, question)
    }

    /// Send a caller-written prompt as is, bypassing retrieval.
    pub fn generate_with_prompt(&self, prompt: &str) -> Result<String> {
        self.composer.compose_with_prompt(prompt)
    }

    pub fn compare(&self, species: &str, question: Option<&str>) -> Result<Comparison> {
        let (rag, context) = match &self.rag {
            Some(rag) => match self.rag_answer(rag, species, question) {
                Ok((answer, context)) => (Some(answer), context),
                Err(e) => {
                    log_rag_failure(species, &e);
                    (None, vec![])
                }
            },
            None => (None, vec![]),
        };
        let direct = self.direct_answer(species, question)?;
        Ok(Comparison { context, rag, direct })
    }

    fn rag_answer(&self, rag: &RagPipeline, species: &str, question: Option<&str>) -> Result<(String, Vec<CareDocument>)> {
        let context = rag.retriever.retrieve(species, question)?;
        tracing::info!(species, documents = context.len(), "retrieved grounding context");
        let request = GenerationRequest::new(species, question, context);
        let answer = self.composer.compose(&request)?;
        Ok((answer, request.context))
    }

    fn direct_answer(&self, species: &str, question: Option<&str>) -> Result<String> {
        self.composer.compose(&GenerationRequest::new(species, question, vec![]))
    }
}

/// Retrieval failures are expected degradations; a model failure on the
/// grounded prompt gets one direct attempt, whose failure is final.
fn log_rag_failure(species: &str, e: &Error) {
    if e.is_recoverable() {
        tracing::warn!(species, error = %e, "RAG path failed, answering without retrieval");
    } else {
        tracing::warn!(species, error = %e, "grounded generation failed, retrying without retrieval");
    }
}
