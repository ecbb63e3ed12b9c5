use anyhow::{Result, anyhow};
use std::time::Instant;

use candle_core::Device;
use tokenizers::Tokenizer;

use medrag_core::traits::Embedder;

use crate::backbone::{Encoder, ModelFiles};
use crate::pool::masked_mean_l2;
use crate::tokenize::{pad_batch, pad_id};

const MAX_LEN: usize = 256;

/// Bi-encoder producing mean-pooled, L2-normalised sentence embeddings.
pub struct SentenceEmbedder {
    model_id: String,
    encoder: Encoder,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    pad_id: u32,
}

impl SentenceEmbedder {
    pub fn load(model_id: &str, files: &ModelFiles, device: Device) -> Result<Self> {
        tracing::info!(model = model_id, dir = %files.dir.display(), "loading embedding model");
        let tokenizer = files.tokenizer(MAX_LEN)?;
        let vb = files.var_builder(&device)?;
        let encoder = Encoder::load(files, vb)?;
        let dim = files.hidden_size()?;
        let pad_id = pad_id(&tokenizer);
        tracing::info!(model = model_id, dim, "embedding model loaded");
        Ok(Self { model_id: model_id.to_string(), encoder, tokenizer, device, dim, pad_id })
    }
}

impl Embedder for SentenceEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { MAX_LEN }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let encodings = self
            .tokenizer
            .encode_batch(texts.iter().map(String::as_str).collect::<Vec<_>>(), true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let inputs = pad_batch(&encodings, MAX_LEN, self.pad_id, &self.device)?;
        let hidden = self.encoder.forward(&inputs)?;
        let pooled = masked_mean_l2(&hidden, &inputs.attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        if let Some(v) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(anyhow!("embedding has {} dims, model reports {}", v.len(), self.dim));
        }
        tracing::debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(vectors)
    }
}
