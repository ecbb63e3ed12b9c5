//! Reciprocal rank fusion of the vector and keyword lists.
//!
//! Ranks, not scores, are combined, so cosine similarity and BM25 never
//! need to share a scale.

use std::collections::{HashMap, HashSet};

use medrag_core::types::{ChunkMetadata, FusedResult, KeywordSearchResult, VectorSearchResult};
use medrag_core::{Error, Result};

/// Keep the first (best-ranked) occurrence of every chunk id.
fn first_occurrences<'a, T>(items: &'a [T], id: impl Fn(&T) -> &str, list: &str) -> Vec<&'a T> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(id(item)) {
            out.push(item);
        } else {
            tracing::warn!(chunk_id = id(item), list, "duplicate chunk in backend results, keeping best-ranked occurrence");
        }
    }
    out
}

struct Entry {
    chunk_id: String,
    doc_id: String,
    text: String,
    metadata: ChunkMetadata,
    score: f64,
    vector_score: Option<f32>,
    keyword_rank: Option<f32>,
}

/// Fuse both lists, scoring each chunk `sum(1 / (k + rank))` over the lists
/// containing it (1-based ranks). Ties keep first-seen order, vector list first.
pub fn reciprocal_rank_fusion(vector: &[VectorSearchResult], keyword: &[KeywordSearchResult], k: u32, top_k: usize) -> Result<Vec<FusedResult>> {
    if k == 0 {
        return Err(Error::InvalidConfig("rrf k must be greater than zero".into()));
    }
    if vector.is_empty() && keyword.is_empty() {
        return Ok(Vec::new());
    }
    if vector.is_empty() { tracing::warn!("vector results are empty, fusing keyword results only"); }
    if keyword.is_empty() { tracing::warn!("keyword results are empty, fusing vector results only"); }

    let k = f64::from(k);
    let mut entries: Vec<Entry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, r) in first_occurrences(vector, |r| r.chunk_id.as_str(), "vector").into_iter().enumerate() {
        index.insert(r.chunk_id.clone(), entries.len());
        entries.push(Entry {
            chunk_id: r.chunk_id.clone(),
            doc_id: r.doc_id.clone(),
            text: r.text.clone(),
            metadata: r.metadata.clone(),
            score: 1.0 / (k + (i + 1) as f64),
            vector_score: Some(r.score),
            keyword_rank: None,
        });
    }
    for (i, r) in first_occurrences(keyword, |r| r.chunk_id.as_str(), "keyword").into_iter().enumerate() {
        let contribution = 1.0 / (k + (i + 1) as f64);
        match index.get(&r.chunk_id) {
            Some(&pos) => {
                let e = &mut entries[pos];
                e.score += contribution;
                e.keyword_rank = Some(r.rank);
            }
            None => {
                index.insert(r.chunk_id.clone(), entries.len());
                entries.push(Entry {
                    chunk_id: r.chunk_id.clone(),
                    doc_id: r.doc_id.clone(),
                    text: r.text.clone(),
                    metadata: r.metadata.clone(),
                    score: contribution,
                    vector_score: None,
                    keyword_rank: Some(r.rank),
                });
            }
        }
    }

    // Stable sort: equal scores stay in first-seen order.
    entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    entries.truncate(top_k);
    if let (Some(first), Some(last)) = (entries.first(), entries.last()) {
        tracing::debug!(unique = index.len(), kept = entries.len(), top = first.score, bottom = last.score, "fusion complete");
    }
    Ok(entries
        .into_iter()
        .map(|e| FusedResult {
            chunk_id: e.chunk_id,
            doc_id: e.doc_id,
            text: e.text,
            rrf_score: e.score,
            vector_score: e.vector_score,
            keyword_rank: e.keyword_rank,
            metadata: e.metadata,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(id: &str, score: f32) -> VectorSearchResult {
        VectorSearchResult { chunk_id: id.into(), doc_id: "d".into(), text: id.into(), score, metadata: ChunkMetadata::default() }
    }

    fn kw(id: &str, rank: f32) -> KeywordSearchResult {
        KeywordSearchResult { chunk_id: id.into(), doc_id: "d".into(), text: id.into(), rank, metadata: ChunkMetadata::default() }
    }

    fn ids(fused: &[FusedResult]) -> Vec<&str> {
        fused.iter().map(|f| f.chunk_id.as_str()).collect()
    }

    #[test]
    fn disjoint_lists_tie_in_input_order() {
        let fused = reciprocal_rank_fusion(&[v("A", 0.9), v("B", 0.8)], &[kw("C", 3.0), kw("D", 2.0)], 60, 20).unwrap();
        assert_eq!(ids(&fused), vec!["A", "C", "B", "D"]);
        let top = 1.0 / 61.0;
        assert!((fused[0].rrf_score - top).abs() < 1e-12);
        assert!((fused[1].rrf_score - top).abs() < 1e-12);
        assert_eq!(fused[1].vector_score, None);
        assert_eq!(fused[0].keyword_rank, None);
    }

    #[test]
    fn shared_chunk_accumulates_both_contributions() {
        let fused = reciprocal_rank_fusion(&[v("A", 0.9), v("B", 0.8)], &[kw("B", 5.0), kw("C", 1.0)], 60, 20).unwrap();
        assert_eq!(fused[0].chunk_id, "B");
        assert!((fused[0].rrf_score - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-12);
        assert_eq!(fused[0].vector_score, Some(0.8));
        assert_eq!(fused[0].keyword_rank, Some(5.0));
    }

    #[test]
    fn duplicates_within_a_list_count_once() {
        let fused = reciprocal_rank_fusion(&[v("A", 0.9), v("A", 0.1), v("B", 0.5)], &[], 60, 20).unwrap();
        assert_eq!(ids(&fused), vec!["A", "B"]);
        assert_eq!(fused[0].vector_score, Some(0.9));
        assert!((fused[1].rrf_score - 1.0 / 62.0).abs() < 1e-12);
    }

    #[test]
    fn output_is_sorted_unique_and_capped() {
        let vector: Vec<_> = (0..10).map(|i| v(&format!("v{i}"), 0.5)).collect();
        let keyword: Vec<_> = (0..10).rev().map(|i| kw(&format!("v{i}"), 1.0)).collect();
        let fused = reciprocal_rank_fusion(&vector, &keyword, 60, 4).unwrap();
        assert_eq!(fused.len(), 4);
        assert!(fused.windows(2).all(|w| w[0].rrf_score >= w[1].rrf_score));
        let unique: HashSet<_> = fused.iter().map(|f| &f.chunk_id).collect();
        assert_eq!(unique.len(), fused.len());
    }

    #[test]
    fn empty_inputs_and_bad_k() {
        assert!(reciprocal_rank_fusion(&[], &[], 60, 5).unwrap().is_empty());
        assert!(reciprocal_rank_fusion(&[v("A", 1.0)], &[], 0, 5).is_err());
    }
}
