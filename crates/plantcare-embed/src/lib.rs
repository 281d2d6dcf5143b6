//! plantcare-embed
//!
//! Text embedders for the plant-care knowledge base. The default is a
//! deterministic feature-hashing embedder (word and character-trigram
//! features), good enough to rank species names and care text without any
//! model files. Enable the `bge-m3` feature for the candle BGE-M3 model and
//! select it with `embed.backend = "bge-m3"`.
use anyhow::Result;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use twox_hash::XxHash64;

use plantcare_core::config::{EmbedBackend, EmbedSettings};
use plantcare_core::traits::Embedder;

#[cfg(feature = "bge-m3")]
pub mod model;
#[cfg(feature = "bge-m3")]
pub mod pool;
#[cfg(feature = "bge-m3")]
pub mod tokenize;

#[cfg(feature = "bge-m3")]
pub use model::BgeM3Embedder;
#[cfg(feature = "bge-m3")]
pub use pool::masked_mean_l2;

pub const HASHING_DIM: usize = 384;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Signed feature hashing over lowercased words and their character
/// trigrams, L2-normalized. Empty input yields the zero vector.
pub struct HashingEmbedder { dim: usize }

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn add_feature(&self, v: &mut [f32], feature: &str, weight: f32) {
        let mut hasher = XxHash64::with_seed(0);
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h % self.dim as u64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        v[idx] += sign * weight;
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lowered = text.to_lowercase();
        for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            self.add_feature(&mut v, word, WORD_WEIGHT);
            let padded: Vec<char> = format!("^{}$", word).chars().collect();
            for tri in padded.windows(3) {
                let tri: String = tri.iter().collect();
                self.add_feature(&mut v, &format!("#{}", tri), TRIGRAM_WEIGHT);
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self { Self::new(HASHING_DIM) }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.embed_text(t)).collect()) }
}

/// Embedder named by `embed.backend`. Asking for `bge-m3` in a build
/// without that feature logs a warning and uses the hashing embedder.
pub fn embedder_from_settings(settings: &EmbedSettings) -> Result<Arc<dyn Embedder>> {
    match settings.backend {
        EmbedBackend::Hashing => Ok(Arc::new(HashingEmbedder::default())),
        #[cfg(feature = "bge-m3")]
        EmbedBackend::BgeM3 => Ok(Arc::new(BgeM3Embedder::from_dir(&settings.model_dir())?)),
        #[cfg(not(feature = "bge-m3"))]
        EmbedBackend::BgeM3 => {
            tracing::warn!("built without the bge-m3 feature, using the hashing embedder");
            Ok(Arc::new(HashingEmbedder::default()))
        }
    }
}

/// Cosine similarity; zero vectors score 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}
