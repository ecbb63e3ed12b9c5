//! medrag-embed
//!
//! Local candle models behind the `Embedder` and `CrossEncoder` traits, plus
//! deterministic fakes selected with `APP_USE_FAKE_EMBEDDINGS=1` so tests and
//! development runs never touch model weights.

pub mod backbone;
pub mod cross_encoder;
pub mod device;
pub mod embedder;
pub mod pool;
pub mod tokenize;

use anyhow::Result;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use twox_hash::XxHash64;

use medrag_core::config::{EmbeddingSettings, RerankerSettings};
use medrag_core::traits::{CrossEncoder, Embedder};

pub use cross_encoder::CandleCrossEncoder;
pub use embedder::SentenceEmbedder;
pub use pool::masked_mean_l2;

/// Hashes whitespace tokens into buckets; same text always maps to the same unit vector.
pub struct FakeEmbedder { dim: usize, id: String }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, id: format!("fake:d{dim}") } }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { 512 }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

impl FakeEmbedder {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

/// Logit from lower-cased token overlap: all query terms present → +4, none → -4.
pub struct FakeCrossEncoder { id: String }

impl Default for FakeCrossEncoder {
    fn default() -> Self { Self { id: "fake:cross-encoder".to_string() } }
}

impl CrossEncoder for FakeCrossEncoder {
    fn model_id(&self) -> &str { &self.id }

    fn score_pairs(&self, query: &str, passages: &[String]) -> Result<Vec<Result<f32>>> {
        let q: HashSet<String> = query.split_whitespace().map(str::to_lowercase).collect();
        Ok(passages
            .iter()
            .map(|p| {
                if q.is_empty() { return Ok(-4.0); }
                let words: HashSet<String> = p.split_whitespace().map(str::to_lowercase).collect();
                let hit = q.iter().filter(|w| words.contains(*w)).count() as f32 / q.len() as f32;
                Ok(8.0 * hit - 4.0)
            })
            .collect())
    }
}

pub fn use_fake_models() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Loader for `ModelSlot<dyn Embedder>`.
pub fn load_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if use_fake_models() {
        tracing::info!("using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.dimension)));
    }
    let dir = backbone::resolve_model_dir(&settings.model, settings.model_dir.as_deref())?;
    let files = backbone::ModelFiles::open(dir)?;
    Ok(Arc::new(SentenceEmbedder::load(&settings.model, &files, device::select_device())?))
}

/// Loader for `ModelSlot<dyn CrossEncoder>`; `model` is the cache key.
pub fn load_cross_encoder(model: &str, settings: &RerankerSettings) -> Result<Arc<dyn CrossEncoder>> {
    if use_fake_models() {
        tracing::info!("using FakeCrossEncoder");
        return Ok(Arc::new(FakeCrossEncoder::default()));
    }
    let configured = if model == settings.model { settings.model_dir.as_deref() } else { None };
    let dir = backbone::resolve_model_dir(model, configured)?;
    let files = backbone::ModelFiles::open(dir)?;
    Ok(Arc::new(CandleCrossEncoder::load(model, &files, device::select_device())?))
}
