//! Cross-encoder reranking of the filtered candidates.

use std::time::Instant;

use medrag_core::config::RerankerSettings;
use medrag_core::models::ModelRegistry;
use medrag_core::traits::CrossEncoder;
use medrag_core::types::{FusedResult, RankedResult};
use medrag_core::{Error, Result};

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Score every candidate against `query` in one batched call and keep the
/// best `top_k`, highest first.
///
/// A pair that fails or yields a non-finite logit scores 0.0; a failure of
/// the batch call itself is an error.
pub fn rerank_with(encoder: &dyn CrossEncoder, query: &str, candidates: Vec<FusedResult>, top_k: usize, warn_above: usize) -> Result<Vec<RankedResult>> {
    if top_k == 0 {
        return Err(Error::InvalidQuery("rerank top_k must be positive".into()));
    }
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    if candidates.len() > warn_above {
        tracing::warn!(count = candidates.len(), limit = warn_above, "large rerank input; latency grows with every pair");
    }
    let start = Instant::now();
    let passages: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    let logits = encoder
        .score_pairs(query, &passages)
        .map_err(|e| Error::Operation(format!("cross-encoder batch failed: {e:#}")))?;
    if logits.len() != candidates.len() {
        return Err(Error::Operation(format!("cross-encoder returned {} scores for {} candidates", logits.len(), candidates.len())));
    }

    let mut ranked: Vec<RankedResult> = candidates
        .into_iter()
        .zip(logits)
        .map(|(c, logit)| {
            let rerank_score = match logit {
                Ok(x) if x.is_finite() => sigmoid(x),
                Ok(x) => {
                    tracing::warn!(chunk_id = %c.chunk_id, logit = x, "non-finite rerank logit, scoring 0.0");
                    0.0
                }
                Err(e) => {
                    tracing::warn!(chunk_id = %c.chunk_id, error = %e, "rerank pair failed, scoring 0.0");
                    0.0
                }
            };
            RankedResult {
                chunk_id: c.chunk_id,
                doc_id: c.doc_id,
                text: c.text,
                rerank_score,
                rrf_score: c.rrf_score,
                vector_score: c.vector_score,
                keyword_rank: c.keyword_rank,
                metadata: c.metadata,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.rerank_score.total_cmp(&a.rerank_score));
    ranked.truncate(top_k);
    tracing::debug!(model = encoder.model_id(), kept = ranked.len(), elapsed_ms = start.elapsed().as_millis() as u64, "rerank complete");
    Ok(ranked)
}

/// `rerank_with` using the registry's cross-encoder for `model`, loaded on
/// first use. Empty input returns before any model is loaded.
pub fn rerank(models: &ModelRegistry, settings: &RerankerSettings, model: &str, query: &str, candidates: Vec<FusedResult>, top_k: usize) -> Result<Vec<RankedResult>> {
    if top_k == 0 {
        return Err(Error::InvalidQuery("rerank top_k must be positive".into()));
    }
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let encoder = models.cross_encoder.get_or_load(model, |name| medrag_embed::load_cross_encoder(name, settings))?;
    rerank_with(encoder.as_ref(), query, candidates, top_k, settings.large_input_warning)
}
