use std::path::{Path, PathBuf};
use std::time::Instant;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, ConstScoreQuery, Occur, Query, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{Index, TantivyDocument, Term};

use medrag_core::traits::KeywordStore;
use medrag_core::types::{KeywordHit, SearchFilters};
use medrag_core::{Error, Result};

use crate::tantivy_utils::{analyze, register_tokenizer, ChunkFields};

/// Keyword store over an index directory written by `TantivyChunkIndexer`.
///
/// The index is opened on every call, on the blocking pool.
#[derive(Debug, Clone)]
pub struct TantivyKeywordStore {
	index_dir: PathBuf,
}

impl TantivyKeywordStore {
	pub fn new(index_dir: impl Into<PathBuf>) -> Self { Self { index_dir: index_dir.into() } }

	pub fn index_dir(&self) -> &Path { &self.index_dir }
}

impl KeywordStore for TantivyKeywordStore {
	async fn ranked(&self, text: &str, filters: &SearchFilters, limit: usize) -> Result<Vec<KeywordHit>> {
		let dir = self.index_dir.clone();
		let text = text.to_string();
		let filters = filters.clone();
		tokio::task::spawn_blocking(move || search_blocking(&dir, &text, &filters, limit))
			.await
			.map_err(|e| Error::Operation(format!("keyword search task failed: {}", e)))?
	}
}

fn op(e: tantivy::TantivyError) -> Error { Error::Operation(format!("tantivy: {}", e)) }

fn search_blocking(dir: &Path, text: &str, filters: &SearchFilters, limit: usize) -> Result<Vec<KeywordHit>> {
	if !dir.join("meta.json").exists() {
		return Err(Error::NotFound(format!("keyword index not found at {}; run `medrag load` to build it", dir.display())));
	}
	let start = Instant::now();
	let index = Index::open_in_dir(dir).map_err(op)?;
	register_tokenizer(&index);
	let fields = ChunkFields::from_schema(&index.schema())?;

	let terms = analyze(&index, fields.text, text).map_err(op)?;
	if terms.is_empty() || limit == 0 {
		tracing::debug!(query = text, "no indexable terms");
		return Ok(Vec::new());
	}

	// Every term must match; filters restrict without contributing to the score.
	let mut clauses: Vec<(Occur, Box<dyn Query>)> = terms
		.iter()
		.map(|t| {
			let q: Box<dyn Query> = Box::new(TermQuery::new(Term::from_field_text(fields.text, t), IndexRecordOption::WithFreqs));
			(Occur::Must, q)
		})
		.collect();
	for (column, value) in filters.pairs() {
		let Some(field) = fields.filter_field(column) else { continue };
		let q: Box<dyn Query> = Box::new(TermQuery::new(Term::from_field_text(field, value), IndexRecordOption::Basic));
		clauses.push((Occur::Must, Box::new(ConstScoreQuery::new(q, 0.0))));
	}
	let query = BooleanQuery::new(clauses);

	let reader = index.reader().map_err(op)?;
	let searcher = reader.searcher();
	let top_docs = searcher.search(&query, &TopDocs::with_limit(limit)).map_err(op)?;
	let mut hits = Vec::with_capacity(top_docs.len());
	for (score, addr) in top_docs {
		let doc: TantivyDocument = searcher.doc(addr).map_err(op)?;
		hits.push(KeywordHit { record: fields.record(&doc)?, rank: score });
	}
	tracing::debug!(terms = terms.len(), hits = hits.len(), elapsed_ms = start.elapsed().as_millis() as u64, "keyword search");
	Ok(hits)
}
