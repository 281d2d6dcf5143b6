#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use plantcare_core::traits::DocumentStore;
use plantcare_core::{CareDocument, Error, QueryResult, Result};
use plantcare_embed::HashingEmbedder;
use plantcare_rag::{GenerationModel, ModelError};
use plantcare_store::MemoryStore;

/// Model double: replays scripted replies, then a default; records prompts.
pub struct ScriptedModel {
    script: Mutex<VecDeque<std::result::Result<String, ModelError>>>,
    default: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(VecDeque::new()), default: Some(text.to_string()), prompts: Mutex::new(vec![]) })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(VecDeque::new()), default: None, prompts: Mutex::new(vec![]) })
    }

    pub fn failing_first_then(text: &str) -> Arc<Self> {
        let script = VecDeque::from(vec![Err(ModelError::Timeout)]);
        Arc::new(Self { script: Mutex::new(script), default: Some(text.to_string()), prompts: Mutex::new(vec![]) })
    }

    pub fn prompts(&self) -> Vec<String> { self.prompts.lock().unwrap().clone() }

    pub fn last_prompt(&self) -> String { self.prompts().last().cloned().expect("model was called") }
}

impl GenerationModel for ScriptedModel {
    fn name(&self) -> &str { "scripted" }

    fn generate(&self, prompt: &str) -> std::result::Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(next) = self.script.lock().unwrap().pop_front() { return next; }
        match &self.default {
            Some(text) => Ok(text.clone()),
            None => Err(ModelError::Http("connection refused".into())),
        }
    }
}

/// A store whose backend is entirely down.
pub struct FailingStore;

impl DocumentStore for FailingStore {
    fn add(&self, _: &[CareDocument]) -> Result<()> { Err(Error::StoreWrite("backend down".into())) }
    fn count(&self) -> Result<usize> { Err(Error::StoreRead("backend down".into())) }
    fn find_exact(&self, _: &str) -> Result<Option<CareDocument>> { Err(Error::StoreRead("backend down".into())) }
    fn find_similar(&self, _: &str, _: usize) -> Result<Vec<QueryResult>> { Err(Error::StoreRead("backend down".into())) }
}

/// Memory store whose reads fail for the first `n` lookups.
pub struct FlakyStore {
    inner: MemoryStore,
    failures_left: AtomicUsize,
}

impl FlakyStore {
    pub fn new(failures: usize) -> Arc<Self> {
        Arc::new(Self { inner: memory_store(), failures_left: AtomicUsize::new(failures) })
    }

    fn trip(&self) -> Result<()> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(Error::StoreRead("index temporarily unavailable".into()));
        }
        Ok(())
    }
}

impl DocumentStore for FlakyStore {
    fn add(&self, documents: &[CareDocument]) -> Result<()> { self.inner.add(documents) }
    fn count(&self) -> Result<usize> { self.inner.count() }
    fn find_exact(&self, species: &str) -> Result<Option<CareDocument>> { self.trip()?; self.inner.find_exact(species) }
    fn find_similar(&self, query: &str, limit: usize) -> Result<Vec<QueryResult>> { self.trip()?; self.inner.find_similar(query, limit) }
}

/// Store with a fixed exact answer and a fixed similarity ranking.
pub struct StubStore {
    pub exact: Option<CareDocument>,
    pub similar: Vec<QueryResult>,
}

impl DocumentStore for StubStore {
    fn add(&self, _: &[CareDocument]) -> Result<()> { Ok(()) }
    fn count(&self) -> Result<usize> { Ok(self.similar.len() + usize::from(self.exact.is_some())) }
    fn find_exact(&self, _: &str) -> Result<Option<CareDocument>> { Ok(self.exact.clone()) }
    fn find_similar(&self, _: &str, limit: usize) -> Result<Vec<QueryResult>> { Ok(self.similar.iter().take(limit).cloned().collect()) }
}

pub fn memory_store() -> MemoryStore { MemoryStore::new(Arc::new(HashingEmbedder::default())) }

pub fn doc(id: &str, species: &str, text: &str) -> CareDocument { CareDocument::new(id, species, text, "test", None) }

/// Write a dataset file into `dir` and return its path.
pub fn write_dataset(dir: &std::path::Path, json: &str) -> PathBuf {
    let path = dir.join("plants.json");
    std::fs::write(&path, json).unwrap();
    path
}

#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// Run `f` under a scoped subscriber and return what it logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buf = LogBuffer::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buf.0.lock().unwrap()).to_string();
    (out, logs)
}
