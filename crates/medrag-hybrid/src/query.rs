//! Query validation, abbreviation expansion and embedding.

use std::time::Instant;

use medrag_core::config::EmbeddingSettings;
use medrag_core::models::ModelRegistry;
use medrag_core::types::ProcessedQuery;
use medrag_core::{Error, Result};

/// Clinical abbreviations and the terms appended when they appear in a query.
pub const EXPANSIONS: &[(&str, &[&str])] = &[
    ("gout", &["urate", "hyperuricemia", "uric acid"]),
    ("ra", &["rheumatoid arthritis"]),
    ("oa", &["osteoarthritis"]),
    ("sle", &["systemic lupus erythematosus", "lupus"]),
    ("as", &["ankylosing spondylitis"]),
    ("psa", &["psoriatic arthritis"]),
    ("ms", &["multiple sclerosis"]),
    ("dmard", &["disease modifying antirheumatic drug"]),
    ("nsaid", &["non-steroidal anti-inflammatory", "anti-inflammatory"]),
    ("methotrexate", &["mtx", "disease modifying antirheumatic drug"]),
];

/// Rough token count: one token per 0.75 words.
pub fn estimate_tokens(text: &str) -> f64 {
    text.split_whitespace().count() as f64 / 0.75
}

pub fn validate_query(text: &str, max_tokens: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InvalidQuery("query must not be empty".into()));
    }
    let estimate = estimate_tokens(text);
    if estimate > max_tokens as f64 {
        return Err(Error::InvalidQuery(format!(
            "query too long: ~{} tokens, limit is {}",
            estimate.ceil() as usize,
            max_tokens
        )));
    }
    Ok(())
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && haystack.windows(phrase.len()).any(|w| w == phrase)
}

/// Append the synonyms of every known abbreviation in `text`.
///
/// Each synonym is added at most once and never when the text already
/// contains it. Text without a known term is returned unchanged.
pub fn expand_query(text: &str) -> String {
    let tokens = words(text);
    let mut seen = tokens.clone();
    let mut additions: Vec<&str> = Vec::new();
    for (term, synonyms) in EXPANSIONS {
        if !tokens.iter().any(|t| t == term) { continue; }
        for synonym in *synonyms {
            let phrase = words(synonym);
            if contains_phrase(&seen, &phrase) { continue; }
            additions.push(synonym);
            seen.extend(phrase);
        }
    }
    if additions.is_empty() {
        text.to_string()
    } else {
        format!("{} {}", text, additions.join(" "))
    }
}

/// Validate, optionally expand and embed `text` with the shared embedding model.
///
/// Validation runs before the model is touched.
pub fn process_query(models: &ModelRegistry, settings: &EmbeddingSettings, text: &str, expand: bool) -> Result<ProcessedQuery> {
    validate_query(text, settings.max_query_tokens)?;
    let expanded = if expand { expand_query(text) } else { text.to_string() };
    let embedder = models.embedder.get_or_load(&settings.model, |_| medrag_embed::load_embedder(settings))?;
    let start = Instant::now();
    let embedding = embedder
        .embed_batch(std::slice::from_ref(&expanded))
        .map_err(|e| Error::Operation(format!("query embedding failed: {e:#}")))?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Operation("embedding model returned no vector".into()))?;
    tracing::debug!(expanded = %expanded, dim = embedding.len(), elapsed_ms = start.elapsed().as_millis() as u64, "query processed");
    Ok(ProcessedQuery {
        original: text.to_string(),
        expanded,
        embedding,
        embedding_model: embedder.model_id().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrag_embed::FakeEmbedder;
    use std::sync::Arc;

    #[test]
    fn rejects_blank_and_oversized_queries() {
        assert!(matches!(validate_query("   \n", 512), Err(Error::InvalidQuery(_))));
        let long = vec!["word"; 385].join(" ");
        assert!(validate_query(&long, 512).is_err());
        let ok = vec!["word"; 384].join(" ");
        assert!(validate_query(&ok, 512).is_ok());
    }

    #[test]
    fn expands_known_abbreviations_once() {
        let expanded = expand_query("gout treatment");
        assert_eq!(expanded, "gout treatment urate hyperuricemia uric acid");

        let both = expand_query("dmard or methotrexate");
        assert_eq!(both.matches("disease modifying antirheumatic drug").count(), 1);
        assert!(both.contains("mtx"));
    }

    #[test]
    fn skips_synonyms_already_present() {
        assert_eq!(expand_query("gout and uric acid"), "gout and uric acid urate hyperuricemia");
        assert_eq!(expand_query("RA in Rheumatoid Arthritis clinic"), "RA in Rheumatoid Arthritis clinic");
    }

    #[test]
    fn unmatched_text_passes_through() {
        assert_eq!(expand_query("asthma inhaler technique"), "asthma inhaler technique");
        // Substrings of a term do not match.
        assert_eq!(expand_query("grams of protein"), "grams of protein");
    }

    #[test]
    fn validation_happens_before_model_load() {
        let models = ModelRegistry::new();
        let err = process_query(&models, &EmbeddingSettings::default(), "", true).unwrap_err();
        assert!(err.is_validation());
        assert!(models.embedder.loaded_name().is_none());
    }

    #[test]
    fn embeds_the_expanded_text() {
        let models = ModelRegistry::new();
        let settings = EmbeddingSettings { dimension: 32, ..Default::default() };
        models.embedder.install(&settings.model, Arc::new(FakeEmbedder::new(32)));
        let q = process_query(&models, &settings, "gout flare", true).unwrap();
        assert_eq!(q.original, "gout flare");
        assert!(q.expanded.starts_with("gout flare "));
        assert_eq!(q.embedding.len(), 32);
        assert_eq!(q.embedding_model, "fake:d32");
    }
}
