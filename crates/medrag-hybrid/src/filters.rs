//! Post-fusion quality gate: metadata equality, allowed content types and a
//! minimum vector similarity.

use serde::{Deserialize, Serialize};

use medrag_core::config::{validate_content_types, validate_unit, RetrievalSettings};
use medrag_core::types::{FusedResult, SearchFilters};
use medrag_core::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub specialty: Option<String>,
    pub source_name: Option<String>,
    pub doc_type: Option<String>,
    pub score_threshold: f32,
    /// `None` admits every content type.
    pub content_types: Option<Vec<String>>,
    /// Candidates with no vector score bypass `score_threshold` when set.
    pub exempt_keyword_only: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            specialty: None,
            source_name: None,
            doc_type: None,
            score_threshold: 0.3,
            content_types: None,
            exempt_keyword_only: true,
        }
    }
}

impl FilterConfig {
    pub fn from_settings(settings: &RetrievalSettings, filters: &SearchFilters) -> Self {
        Self {
            specialty: filters.specialty.clone(),
            source_name: filters.source_name.clone(),
            doc_type: filters.doc_type.clone(),
            score_threshold: settings.score_threshold,
            content_types: settings.content_types.clone(),
            exempt_keyword_only: settings.exempt_keyword_only,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_unit("score_threshold", self.score_threshold)?;
        if let Some(types) = &self.content_types {
            validate_content_types(types)?;
        }
        Ok(())
    }

    fn passes_threshold(&self, r: &FusedResult) -> bool {
        match r.vector_score {
            Some(score) => score >= self.score_threshold,
            None => self.exempt_keyword_only,
        }
    }

    fn passes_metadata(&self, r: &FusedResult) -> bool {
        let meta = &r.metadata;
        let eq = |want: &Option<String>, have: &Option<String>| want.is_none() || want == have;
        eq(&self.specialty, &meta.specialty)
            && eq(&self.source_name, &meta.source_name)
            && eq(&self.doc_type, &meta.doc_type)
            && self
                .content_types
                .as_ref()
                .map_or(true, |allowed| meta.content_type.as_ref().is_some_and(|t| allowed.contains(t)))
    }
}

/// Drop candidates failing any constraint. Order is preserved; an empty
/// outcome is logged, not an error.
pub fn apply_filters(results: Vec<FusedResult>, config: &FilterConfig) -> Result<Vec<FusedResult>> {
    config.validate()?;
    if results.is_empty() {
        return Ok(results);
    }
    let before = results.len();
    let (mut below_threshold, mut off_metadata) = (0usize, 0usize);
    let kept: Vec<FusedResult> = results
        .into_iter()
        .filter(|r| {
            if !config.passes_threshold(r) { below_threshold += 1; return false; }
            if !config.passes_metadata(r) { off_metadata += 1; return false; }
            true
        })
        .collect();
    tracing::debug!(before, kept = kept.len(), below_threshold, off_metadata, "filters applied");
    if kept.is_empty() {
        tracing::warn!(threshold = config.score_threshold, "all candidates removed by filters; consider lowering score_threshold or relaxing metadata filters");
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrag_core::types::ChunkMetadata;
    use medrag_core::Error;

    fn fused(id: &str, vector_score: Option<f32>, specialty: &str, content_type: &str) -> FusedResult {
        FusedResult {
            chunk_id: id.into(),
            doc_id: "d".into(),
            text: id.into(),
            rrf_score: 0.01,
            vector_score,
            keyword_rank: vector_score.is_none().then_some(1.0),
            metadata: ChunkMetadata { specialty: Some(specialty.into()), content_type: Some(content_type.into()), ..Default::default() },
        }
    }

    fn sample() -> Vec<FusedResult> {
        vec![
            fused("a", Some(0.9), "rheumatology", "text"),
            fused("b", Some(0.1), "rheumatology", "text"),
            fused("c", None, "rheumatology", "table"),
            fused("d", Some(0.5), "cardiology", "text"),
        ]
    }

    fn ids(r: &[FusedResult]) -> Vec<&str> { r.iter().map(|f| f.chunk_id.as_str()).collect() }

    #[test]
    fn threshold_exempts_keyword_only_candidates() {
        let out = apply_filters(sample(), &FilterConfig::default()).unwrap();
        assert_eq!(ids(&out), vec!["a", "c", "d"]);
        assert!(out.iter().all(|r| r.vector_score.map_or(true, |s| s >= 0.3)));
    }

    #[test]
    fn keyword_only_dropped_without_exemption() {
        let config = FilterConfig { exempt_keyword_only: false, ..Default::default() };
        assert_eq!(ids(&apply_filters(sample(), &config).unwrap()), vec!["a", "d"]);
    }

    #[test]
    fn metadata_and_content_type_constraints_are_anded() {
        let config = FilterConfig {
            specialty: Some("rheumatology".into()),
            content_types: Some(vec!["table".into()]),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(sample(), &config).unwrap()), vec!["c"]);
    }

    #[test]
    fn everything_filtered_is_empty_not_error() {
        let config = FilterConfig { specialty: Some("dermatology".into()), ..Default::default() };
        assert!(apply_filters(sample(), &config).unwrap().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = FilterConfig { score_threshold: 1.5, ..Default::default() };
        assert!(matches!(apply_filters(sample(), &config), Err(Error::InvalidConfig(_))));
        let config = FilterConfig { content_types: Some(vec!["image".into()]), ..Default::default() };
        let err = apply_filters(Vec::new(), &config).unwrap_err();
        assert!(err.to_string().contains("image"));
    }
}
