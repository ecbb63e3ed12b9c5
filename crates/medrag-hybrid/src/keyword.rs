use medrag_core::traits::KeywordStore;
use medrag_core::types::{KeywordSearchResult, SearchFilters};
use medrag_core::{Error, Result};

/// Full-text matches for `text`, highest rank first.
pub async fn keyword_search<K: KeywordStore>(store: &K, text: &str, filters: &SearchFilters, top_k: usize) -> Result<Vec<KeywordSearchResult>> {
    if top_k == 0 {
        return Err(Error::InvalidQuery("keyword top_k must be positive".into()));
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let hits = store.ranked(text, filters, top_k).await?;
    let mut results: Vec<KeywordSearchResult> = hits
        .into_iter()
        .map(|h| KeywordSearchResult {
            rank: h.rank,
            chunk_id: h.record.chunk_id,
            doc_id: h.record.doc_id,
            text: h.record.text,
            metadata: h.record.metadata,
        })
        .collect();
    results.sort_by(|a, b| b.rank.total_cmp(&a.rank));
    results.truncate(top_k);
    tracing::debug!(count = results.len(), "keyword search results");
    Ok(results)
}
