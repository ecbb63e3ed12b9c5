use std::future::Future;

use crate::error::Result;
use crate::types::{KeywordHit, SearchFilters, VectorHit};

pub trait Embedder: Send + Sync {
    /// Stable identifier of the loaded model (e.g. `sentence-transformers/all-MiniLM-L6-v2`).
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Joint (query, passage) relevance model.
///
/// The outer `Result` is the batch call; each inner `Result` is one pair's
/// raw logit, so a single bad pair does not poison the batch.
pub trait CrossEncoder: Send + Sync {
    fn model_id(&self) -> &str;
    fn score_pairs(&self, query: &str, passages: &[String]) -> anyhow::Result<Vec<anyhow::Result<f32>>>;
}

/// Nearest-neighbour side of the chunk store.
pub trait VectorStore: Send + Sync {
    /// Dimension the store was built with.
    fn dim(&self) -> usize;
    /// Up to `limit` hits ordered by cosine distance ascending.
    fn nearest(&self, embedding: &[f32], filters: &SearchFilters, limit: usize) -> impl Future<Output = Result<Vec<VectorHit>>> + Send;
}

/// Ranked full-text side of the chunk store.
pub trait KeywordStore: Send + Sync {
    /// Up to `limit` hits ordered by rank descending. A query with no
    /// indexable terms yields an empty list.
    fn ranked(&self, text: &str, filters: &SearchFilters, limit: usize) -> impl Future<Output = Result<Vec<KeywordHit>>> + Send;
}
