//! BGE-M3 (XLM-RoBERTa) sentence embeddings on candle.
use anyhow::{anyhow, bail, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;

use plantcare_core::traits::Embedder;

use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

pub const BGE_M3_DIM: usize = 1024;
/// Care texts are short; longer inputs are truncated.
const MAX_TOKENS: usize = 256;

const MODEL_FILES: [&str; 3] = ["tokenizer.json", "config.json", "pytorch_model.bin"];

pub struct BgeM3Embedder { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device }

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => { tracing::info!("embedding on Metal"); return dev; }
            Err(e) => tracing::warn!(error = %e, "Metal unavailable, embedding on CPU"),
        }
    }
    Device::Cpu
}

/// Fails fast, naming every missing file, before any weights are read.
fn check_model_dir(model_dir: &Path) -> Result<()> {
    if !model_dir.is_dir() { bail!("BGE-M3 model directory not found: {}", model_dir.display()); }
    let missing: Vec<&str> = MODEL_FILES.iter().copied().filter(|f| !model_dir.join(f).is_file()).collect();
    if !missing.is_empty() { bail!("BGE-M3 model directory {} is missing {}", model_dir.display(), missing.join(", ")); }
    Ok(())
}

impl BgeM3Embedder {
    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        check_model_dir(model_dir)?;
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json")).map_err(|e| anyhow!("cannot load tokenizer: {e}"))?;
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        Ok(Self { model, tokenizer, device })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, MAX_TOKENS, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_TOKENS), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let v: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if v.len() != BGE_M3_DIM { bail!("expected {} dims, got {}", BGE_M3_DIM, v.len()); }
        tracing::trace!(elapsed_ms = start.elapsed().as_millis() as u64, "embedded text");
        Ok(v)
    }
}

impl Embedder for BgeM3Embedder {
    fn dim(&self) -> usize { BGE_M3_DIM }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { texts.iter().map(|t| self.embed_text(t)).collect() }
}
