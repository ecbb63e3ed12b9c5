//! End-to-end retrieval: query → {vector, keyword} → fusion → filters →
//! rerank → dedup → citations.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use medrag_core::config::Settings;
use medrag_core::models::ModelRegistry;
use medrag_core::traits::{KeywordStore, VectorStore};
use medrag_core::types::{CitedResult, KeywordSearchResult, SearchFilters, VectorSearchResult};
use medrag_core::{Error, Result, RetrievalError, Stage};

use crate::citation::assemble_citations;
use crate::debug::ArtifactWriter;
use crate::dedup::deduplicate;
use crate::filters::{apply_filters, FilterConfig};
use crate::fusion::reciprocal_rank_fusion;
use crate::keyword::keyword_search;
use crate::query::process_query;
use crate::rerank::rerank;
use crate::vector::vector_search;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Vector,
    Keyword,
}

/// How the concurrent backend searches ended.
#[derive(Debug)]
pub enum SearchOutcome {
    Both { vector: Vec<VectorSearchResult>, keyword: Vec<KeywordSearchResult> },
    /// One backend failed; the other's results stand alone.
    Degraded { vector: Vec<VectorSearchResult>, keyword: Vec<KeywordSearchResult>, failed: Backend, error: Error },
    Failed { vector: Error, keyword: Error },
}

impl SearchOutcome {
    pub fn from_results(vector: Result<Vec<VectorSearchResult>>, keyword: Result<Vec<KeywordSearchResult>>) -> Self {
        match (vector, keyword) {
            (Ok(vector), Ok(keyword)) => SearchOutcome::Both { vector, keyword },
            (Err(error), Ok(keyword)) => SearchOutcome::Degraded { vector: Vec::new(), keyword, failed: Backend::Vector, error },
            (Ok(vector), Err(error)) => SearchOutcome::Degraded { vector, keyword: Vec::new(), failed: Backend::Keyword, error },
            (Err(vector), Err(keyword)) => SearchOutcome::Failed { vector, keyword },
        }
    }

    /// The two lists to fuse, or the combined error when nothing survived.
    pub fn into_lists(self) -> Result<(Vec<VectorSearchResult>, Vec<KeywordSearchResult>)> {
        match self {
            SearchOutcome::Both { vector, keyword } => Ok((vector, keyword)),
            SearchOutcome::Degraded { vector, keyword, failed, error } => {
                tracing::warn!(backend = ?failed, error = %error, "search backend failed, continuing with the other");
                Ok((vector, keyword))
            }
            SearchOutcome::Failed { vector, keyword } => {
                Err(Error::Operation(format!("both search backends failed: vector: {}; keyword: {}", vector, keyword)))
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SearchOutcome::Both { .. } => "both",
            SearchOutcome::Degraded { failed: Backend::Vector, .. } => "keyword_only",
            SearchOutcome::Degraded { failed: Backend::Keyword, .. } => "vector_only",
            SearchOutcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Serialize)]
struct SearchArtifact<'a> {
    outcome: &'a str,
    vector: &'a [VectorSearchResult],
    keyword: &'a [KeywordSearchResult],
}

/// Hybrid retriever over a vector store and a keyword store.
pub struct Retriever<V, K> {
    vector: V,
    keyword: K,
    models: Arc<ModelRegistry>,
    settings: Settings,
}

impl<V: VectorStore, K: KeywordStore> Retriever<V, K> {
    /// Validates `settings` and uses the process-wide model registry.
    pub fn new(vector: V, keyword: K, settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { vector, keyword, models: ModelRegistry::shared(), settings })
    }

    pub fn with_models(mut self, models: Arc<ModelRegistry>) -> Self {
        self.models = models;
        self
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    /// Ranked, deduplicated and cited passages for `query`, at most `top_k`.
    pub async fn retrieve(&self, query: &str, filters: &SearchFilters, top_k: usize) -> std::result::Result<Vec<CitedResult>, RetrievalError> {
        let fail = |stage: Stage| move |e: Error| RetrievalError::new(stage, query, e);
        let start = Instant::now();
        let retrieval = &self.settings.retrieval;
        if top_k == 0 {
            return Err(fail(Stage::Query)(Error::InvalidQuery("top_k must be positive".into())));
        }
        let artifacts = self.settings.debug.enabled.then(|| ArtifactWriter::new(&self.settings.debug.artifact_dir, query));
        if let Some(a) = &artifacts {
            tracing::info!(request_id = a.request_id(), "writing debug artifacts");
        }

        // QUERY
        let processed = {
            let models = Arc::clone(&self.models);
            let embedding = self.settings.embedding.clone();
            let text = query.to_string();
            let expand = retrieval.expand;
            tokio::task::spawn_blocking(move || process_query(&models, &embedding, &text, expand))
                .await
                .map_err(|e| Error::Operation(format!("query task failed: {}", e)))
                .and_then(|r| r)
                .map_err(fail(Stage::Query))?
        };
        if let Some(a) = &artifacts { a.write("query", &processed); }

        // SEARCH
        let (vector, keyword) = tokio::join!(
            vector_search(&self.vector, &processed, filters, retrieval.vector_candidates(top_k)),
            keyword_search(&self.keyword, &processed.original, filters, retrieval.keyword_candidates(top_k)),
        );
        let outcome = SearchOutcome::from_results(vector, keyword);
        let label = outcome.label();
        let (vector, keyword) = outcome.into_lists().map_err(fail(Stage::Search))?;
        tracing::debug!(outcome = label, vector = vector.len(), keyword = keyword.len(), "search complete");
        if let Some(a) = &artifacts {
            a.write("search", &SearchArtifact { outcome: label, vector: &vector, keyword: &keyword });
        }

        // FUSION
        let fused = reciprocal_rank_fusion(&vector, &keyword, retrieval.rrf_k, retrieval.fusion_top_k).map_err(fail(Stage::Fusion))?;
        if let Some(a) = &artifacts { a.write("fusion", &fused); }

        // FILTERS
        let filtered = apply_filters(fused, &FilterConfig::from_settings(retrieval, filters)).map_err(fail(Stage::Filters))?;
        if let Some(a) = &artifacts { a.write("filters", &filtered); }
        if filtered.is_empty() {
            tracing::info!(query, "no candidates survived filtering");
            return Ok(Vec::new());
        }

        // RERANK
        let ranked = {
            let models = Arc::clone(&self.models);
            let reranker = self.settings.reranker.clone();
            let text = query.to_string();
            tokio::task::spawn_blocking(move || rerank(&models, &reranker, &reranker.model, &text, filtered, top_k))
                .await
                .map_err(|e| Error::Operation(format!("rerank task failed: {}", e)))
                .and_then(|r| r)
                .map_err(fail(Stage::Rerank))?
        };
        if let Some(a) = &artifacts { a.write("rerank", &ranked); }
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        // DEDUP
        let unique = deduplicate(ranked, retrieval.similarity_threshold).map_err(fail(Stage::Dedup))?;
        if let Some(a) = &artifacts { a.write("dedup", &unique); }

        // CITATIONS
        let cited = assemble_citations(unique).map_err(fail(Stage::Citations))?;
        if let Some(a) = &artifacts { a.write("citations", &cited); }

        tracing::info!(results = cited.len(), elapsed_ms = start.elapsed().as_millis() as u64, "retrieval complete");
        Ok(cited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v() -> Vec<VectorSearchResult> { Vec::new() }
    fn k() -> Vec<KeywordSearchResult> { Vec::new() }

    #[test]
    fn outcome_state_machine() {
        let both = SearchOutcome::from_results(Ok(v()), Ok(k()));
        assert!(matches!(both, SearchOutcome::Both { .. }));

        let degraded = SearchOutcome::from_results(Err(Error::Operation("down".into())), Ok(k()));
        assert!(matches!(degraded, SearchOutcome::Degraded { failed: Backend::Vector, .. }));
        assert!(degraded.into_lists().is_ok());

        let degraded = SearchOutcome::from_results(Ok(v()), Err(Error::Operation("down".into())));
        assert!(matches!(degraded, SearchOutcome::Degraded { failed: Backend::Keyword, .. }));
        assert_eq!(degraded.label(), "vector_only");
        let (vector, keyword) = degraded.into_lists().unwrap();
        assert_eq!(vector.len(), v().len());
        assert!(keyword.is_empty());

        let failed = SearchOutcome::from_results(Err(Error::Operation("a".into())), Err(Error::NotFound("b".into())));
        let err = failed.into_lists().unwrap_err().to_string();
        assert!(err.contains("vector: Operation failed: a"));
        assert!(err.contains("keyword: Not found: b"));
    }
}
