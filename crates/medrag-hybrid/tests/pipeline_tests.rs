use std::sync::Arc;

use medrag_core::config::Settings;
use medrag_core::models::ModelRegistry;
use medrag_core::traits::{KeywordStore, VectorStore};
use medrag_core::types::{ChunkMetadata, ChunkRecord, KeywordHit, SearchFilters, VectorHit};
use medrag_core::{Error, Result, Stage};
use medrag_embed::{FakeCrossEncoder, FakeEmbedder};
use medrag_hybrid::{render_context, Retriever};

const DIM: usize = 8;

#[derive(Clone, Default)]
struct MockVector {
    hits: Vec<VectorHit>,
    fail: Option<String>,
}

impl VectorStore for MockVector {
    fn dim(&self) -> usize { DIM }

    async fn nearest(&self, _embedding: &[f32], filters: &SearchFilters, limit: usize) -> Result<Vec<VectorHit>> {
        if let Some(msg) = &self.fail {
            return Err(Error::Operation(msg.clone()));
        }
        Ok(self.hits.iter().filter(|h| filters.matches(&h.record.metadata)).take(limit).cloned().collect())
    }
}

#[derive(Clone, Default)]
struct MockKeyword {
    hits: Vec<KeywordHit>,
    fail: Option<String>,
}

impl KeywordStore for MockKeyword {
    async fn ranked(&self, _text: &str, filters: &SearchFilters, limit: usize) -> Result<Vec<KeywordHit>> {
        if let Some(msg) = &self.fail {
            return Err(Error::NotFound(msg.clone()));
        }
        Ok(self.hits.iter().filter(|h| filters.matches(&h.record.metadata)).take(limit).cloned().collect())
    }
}

fn meta(source: &str, specialty: &str) -> ChunkMetadata {
    ChunkMetadata {
        specialty: Some(specialty.to_string()),
        source_name: Some(source.to_string()),
        doc_type: Some("guideline".to_string()),
        title: Some(format!("{source} gout guideline")),
        author_org: Some(source.to_string()),
        source_url: Some(format!("https://example.org/{source}")),
        section_path: vec!["Management".to_string()],
        section_title: Some("Management".to_string()),
        page_start: Some(3),
        page_end: Some(3),
        content_type: Some("text".to_string()),
    }
}

fn record(id: &str, text: &str, metadata: ChunkMetadata) -> ChunkRecord {
    ChunkRecord { chunk_id: id.to_string(), doc_id: format!("doc-{id}"), doc_version: "1".to_string(), text: text.to_string(), metadata }
}

fn vhit(id: &str, text: &str, distance: f32) -> VectorHit {
    VectorHit { record: record(id, text, meta("NICE", "rheumatology")), distance }
}

fn khit(id: &str, text: &str, rank: f32) -> KeywordHit {
    KeywordHit { record: record(id, text, meta("ACR", "rheumatology")), rank }
}

fn settings() -> Settings {
    let mut s = Settings::default();
    s.embedding.dimension = DIM;
    s
}

fn retriever(vector: MockVector, keyword: MockKeyword, settings: Settings) -> Retriever<MockVector, MockKeyword> {
    let models = Arc::new(ModelRegistry::new());
    models.embedder.install(&settings.embedding.model, Arc::new(FakeEmbedder::new(DIM)));
    models.cross_encoder.install(&settings.reranker.model, Arc::new(FakeCrossEncoder::default()));
    Retriever::new(vector, keyword, settings).expect("valid settings").with_models(models)
}

fn stores() -> (MockVector, MockKeyword) {
    let vector = MockVector {
        hits: vec![
            vhit("a", "colchicine for acute gout treatment", 0.1),
            vhit("b", "allopurinol dose escalation in gout", 0.2),
            vhit("x", "asthma inhaler review", 0.3),
        ],
        fail: None,
    };
    let keyword = MockKeyword {
        hits: vec![
            khit("b", "allopurinol dose escalation in gout", 7.0),
            khit("c", "treatment targets for serum urate in gout", 5.0),
        ],
        fail: None,
    };
    (vector, keyword)
}

#[tokio::test]
async fn retrieves_cited_results_in_rerank_order() {
    let (vector, keyword) = stores();
    let r = retriever(vector, keyword, settings());
    let results = r.retrieve("gout treatment", &SearchFilters::default(), 5).await.expect("retrieve");

    let ids: Vec<_> = results.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(ids.len(), 4);
    // Full query overlap ranks first.
    assert!(ids[0] == "a" || ids[0] == "c");
    assert!(results.windows(2).all(|w| w[0].rerank_score >= w[1].rerank_score));
    assert!(results.iter().all(|c| (0.0..=1.0).contains(&c.rerank_score)));

    let b = results.iter().find(|c| c.chunk_id == "b").expect("b present");
    assert!(b.vector_score.is_some() && b.keyword_rank.is_some());
    let c = results.iter().find(|c| c.chunk_id == "c").expect("c present");
    assert_eq!(c.vector_score, None);
    assert_eq!(c.citation.source_name, "ACR");

    let context = render_context(&results);
    assert!(context.starts_with("[1] "));
    assert!(context.contains("(page 3)"));
}

#[tokio::test]
async fn vector_failure_degrades_to_keyword_results() {
    let (_, keyword) = stores();
    let keyword = MockKeyword {
        hits: vec![
            khit("k1", "gout treatment with colchicine", 9.0),
            khit("k2", "gout flare prophylaxis", 6.0),
            khit("k3", "urate lowering treatment", 3.0),
        ],
        ..keyword
    };
    let vector = MockVector { fail: Some("lancedb unreachable".into()), ..Default::default() };
    let results = retriever(vector, keyword, settings()).retrieve("gout treatment", &SearchFilters::default(), 5).await.expect("degraded");
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|c| c.vector_score.is_none() && c.keyword_rank.is_some()));
}

#[tokio::test]
async fn keyword_failure_degrades_to_vector_results() {
    let (vector, _) = stores();
    let keyword = MockKeyword { fail: Some("index missing".into()), ..Default::default() };
    let results = retriever(vector, keyword, settings()).retrieve("gout treatment", &SearchFilters::default(), 5).await.expect("degraded");
    let mut ids: Vec<_> = results.iter().map(|c| c.chunk_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b", "x"]);
    assert!(results.iter().all(|c| c.vector_score.is_some() && c.keyword_rank.is_none()));
    assert!(results.iter().all(|c| c.citation.source_name == "NICE"));
}

#[tokio::test]
async fn both_backends_failing_is_a_search_error() {
    let vector = MockVector { fail: Some("vector down".into()), ..Default::default() };
    let keyword = MockKeyword { fail: Some("index missing".into()), ..Default::default() };
    let err = retriever(vector, keyword, settings()).retrieve("gout treatment", &SearchFilters::default(), 5).await.unwrap_err();
    assert_eq!(err.stage, Stage::Search);
    assert_eq!(err.query, "gout treatment");
    assert!(err.to_string().starts_with("[SEARCH]"));
}

#[tokio::test]
async fn invalid_queries_fail_at_the_query_stage() {
    let (vector, keyword) = stores();
    let r = retriever(vector, keyword, settings());
    let err = r.retrieve("   ", &SearchFilters::default(), 5).await.unwrap_err();
    assert_eq!(err.stage, Stage::Query);
    assert!(err.is_validation());

    let err = r.retrieve("gout", &SearchFilters::default(), 0).await.unwrap_err();
    assert_eq!(err.stage, Stage::Query);
}

#[tokio::test]
async fn missing_citation_field_fails_loudly() {
    let (mut vector, keyword) = stores();
    vector.hits[0].record.metadata.source_url = None;
    let err = retriever(vector, keyword, settings()).retrieve("gout treatment", &SearchFilters::default(), 5).await.unwrap_err();
    assert_eq!(err.stage, Stage::Citations);
    let msg = err.to_string();
    assert!(msg.contains("source_url") && msg.contains("'a'"), "{msg}");
}

#[tokio::test]
async fn everything_filtered_returns_empty() {
    let (vector, keyword) = stores();
    let mut s = settings();
    s.retrieval.score_threshold = 1.0;
    s.retrieval.exempt_keyword_only = false;
    let results = retriever(vector, keyword, s).retrieve("gout treatment", &SearchFilters::default(), 5).await.expect("ok");
    assert!(results.is_empty());
}

#[tokio::test]
async fn filters_reach_both_backends() {
    let (vector, keyword) = stores();
    let filters = SearchFilters { source_name: Some("ACR".into()), ..Default::default() };
    let results = retriever(vector, keyword, settings()).retrieve("gout treatment", &filters, 5).await.expect("ok");
    assert!(!results.is_empty());
    assert!(results.iter().all(|c| c.citation.source_name == "ACR"));
}

#[tokio::test]
async fn near_duplicates_are_collapsed() {
    let vector = MockVector {
        hits: vec![
            vhit("a", "gout treatment with colchicine at low dose", 0.1),
            vhit("a2", "gout treatment with colchicine at low dose daily", 0.15),
        ],
        fail: None,
    };
    let results = retriever(vector, MockKeyword::default(), settings()).retrieve("gout treatment", &SearchFilters::default(), 5).await.expect("ok");
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn debug_mode_writes_one_artifact_per_stage() {
    let tmp = tempfile::tempdir().unwrap();
    let (vector, keyword) = stores();
    let mut s = settings();
    s.debug.enabled = true;
    s.debug.artifact_dir = tmp.path().to_string_lossy().to_string();
    retriever(vector, keyword, s).retrieve("gout treatment", &SearchFilters::default(), 5).await.expect("ok");

    let mut stages: Vec<String> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .map(|name| name.split_once('_').unwrap().1.trim_end_matches(".json").to_string())
        .collect();
    stages.sort();
    assert_eq!(stages, vec!["citations", "dedup", "filters", "fusion", "query", "rerank", "search"]);
}
