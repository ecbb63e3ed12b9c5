use medrag_core::traits::VectorStore;
use medrag_core::types::{ProcessedQuery, SearchFilters, VectorSearchResult};
use medrag_core::{Error, Result};

/// Cosine similarity from cosine distance, floored at zero.
pub fn similarity(distance: f32) -> f32 {
    (1.0 - distance).max(0.0)
}

/// Nearest chunks to the query embedding, best first.
pub async fn vector_search<V: VectorStore>(store: &V, query: &ProcessedQuery, filters: &SearchFilters, top_k: usize) -> Result<Vec<VectorSearchResult>> {
    if top_k == 0 {
        return Err(Error::InvalidQuery("vector top_k must be positive".into()));
    }
    if query.embedding.len() != store.dim() {
        return Err(Error::DimensionMismatch { expected: store.dim(), actual: query.embedding.len() });
    }
    let hits = store.nearest(&query.embedding, filters, top_k).await?;
    let mut results: Vec<VectorSearchResult> = hits
        .into_iter()
        .map(|h| VectorSearchResult {
            score: similarity(h.distance),
            chunk_id: h.record.chunk_id,
            doc_id: h.record.doc_id,
            text: h.record.text,
            metadata: h.record.metadata,
        })
        .collect();
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(top_k);
    tracing::debug!(count = results.len(), "vector search results");
    Ok(results)
}
