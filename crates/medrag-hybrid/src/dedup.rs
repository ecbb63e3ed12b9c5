use std::collections::HashSet;

use medrag_core::config::validate_unit;
use medrag_core::types::RankedResult;
use medrag_core::Result;

fn token_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Token-set Jaccard similarity. Two empty texts are identical.
pub fn jaccard(a: &str, b: &str) -> f32 {
    set_jaccard(&token_set(a), &token_set(b))
}

/// Drop near-duplicate passages, keeping the higher `rerank_score` of each
/// similar pair (the earlier one on a tie). Order is preserved.
pub fn deduplicate(results: Vec<RankedResult>, threshold: f32) -> Result<Vec<RankedResult>> {
    validate_unit("similarity_threshold", threshold)?;
    let tokens: Vec<HashSet<String>> = results.iter().map(|r| token_set(&r.text)).collect();
    let mut dropped = vec![false; results.len()];
    for i in 0..results.len() {
        if dropped[i] { continue; }
        for j in (i + 1)..results.len() {
            if dropped[j] { continue; }
            if set_jaccard(&tokens[i], &tokens[j]) < threshold { continue; }
            if results[j].rerank_score > results[i].rerank_score {
                tracing::debug!(kept = %results[j].chunk_id, dropped = %results[i].chunk_id, "near-duplicate removed");
                dropped[i] = true;
                break;
            }
            tracing::debug!(kept = %results[i].chunk_id, dropped = %results[j].chunk_id, "near-duplicate removed");
            dropped[j] = true;
        }
    }
    Ok(results.into_iter().zip(dropped).filter(|(_, d)| !d).map(|(r, _)| r).collect())
}

fn set_jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    a.intersection(b).count() as f32 / a.union(b).count() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrag_core::types::ChunkMetadata;

    fn ranked(id: &str, text: &str, score: f32) -> RankedResult {
        RankedResult { chunk_id: id.into(), doc_id: "d".into(), text: text.into(), rerank_score: score, rrf_score: 0.01, vector_score: None, keyword_rank: None, metadata: ChunkMetadata::default() }
    }

    const TEN: &str = "one two three four five six seven eight nine ten";

    #[test]
    fn jaccard_properties() {
        assert_eq!(jaccard("", ""), 1.0);
        assert_eq!(jaccard("a b", "A B"), 1.0);
        assert_eq!(jaccard("a b", ""), 0.0);
        let (x, y) = ("gout urate therapy", "urate lowering therapy");
        assert_eq!(jaccard(x, y), jaccard(y, x));
        assert!((jaccard(x, y) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn keeps_the_higher_scored_duplicate() {
        // 9 shared tokens of 10 total: Jaccard 0.9.
        let near = "one two three four five six seven eight nine";
        let out = deduplicate(vec![ranked("low", TEN, 0.7), ranked("high", near, 0.9)], 0.85).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].chunk_id, "high");
    }

    #[test]
    fn tie_keeps_the_earlier_item() {
        let out = deduplicate(vec![ranked("a", TEN, 0.5), ranked("b", TEN, 0.5)], 0.85).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].chunk_id, "a");
    }

    #[test]
    fn dropped_items_do_not_drop_others() {
        // b duplicates a and c, but a and c are distinct; b is removed first.
        let a = "alpha beta gamma delta";
        let b = "alpha beta gamma delta epsilon zeta eta theta";
        let c = "epsilon zeta eta theta";
        let out = deduplicate(vec![ranked("a", a, 0.9), ranked("b", b, 0.5), ranked("c", c, 0.8)], 0.5).unwrap();
        let ids: Vec<_> = out.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn deduplicate_is_idempotent() {
        let items = vec![
            ranked("a", TEN, 0.4),
            ranked("b", "one two three four five six seven eight nine", 0.8),
            ranked("c", "completely different passage text", 0.6),
            ranked("d", "completely different passage text here", 0.7),
        ];
        let once = deduplicate(items, 0.75).unwrap();
        let twice = deduplicate(once.clone(), 0.75).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        assert!(deduplicate(Vec::new(), 1.2).is_err());
    }
}
