use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING};
use tantivy::tokenizer::{Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer, TokenStream};
use tantivy::{Index, TantivyDocument};

use medrag_core::types::{ChunkMetadata, ChunkRecord};
use medrag_core::{Error, Result};

pub const TOKENIZER: &str = "clinical_en";

const STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","but","by","for","from","has","have","in","into","is","it","its","no","not","of","on","or","such","that","the","their","then","there","these","they","this","to","was","were","will","with",
];

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("chunk_id", STRING | STORED);
	schema_builder.add_text_field("doc_id", STRING | STORED);
	schema_builder.add_text_field("doc_version", STRING | STORED);
	schema_builder.add_text_field("content_type", STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field("text", text_options);
	// Filter columns are exact-match only; the full metadata travels as JSON.
	schema_builder.add_text_field("specialty", STRING);
	schema_builder.add_text_field("source_name", STRING);
	schema_builder.add_text_field("doc_type", STRING);
	schema_builder.add_text_field("metadata", STORED);
	schema_builder.build()
}

/// English analyzer: lower-case, stop words removed, Snowball stemmed.
pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(40))
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
		.filter(Stemmer::new(Language::English))
		.build();
	index.tokenizers().register(TOKENIZER, tokenizer);
}

/// Distinct analyzed terms of `text`, in order of first appearance.
pub fn analyze(index: &Index, field: Field, text: &str) -> tantivy::Result<Vec<String>> {
	let mut analyzer = index.tokenizer_for_field(field)?;
	let mut stream = analyzer.token_stream(text);
	let mut terms: Vec<String> = Vec::new();
	while stream.advance() {
		let term = &stream.token().text;
		if !terms.contains(term) { terms.push(term.clone()); }
	}
	Ok(terms)
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkFields {
	pub chunk_id: Field,
	pub doc_id: Field,
	pub doc_version: Field,
	pub content_type: Field,
	pub text: Field,
	pub specialty: Field,
	pub source_name: Field,
	pub doc_type: Field,
	pub metadata: Field,
}

impl ChunkFields {
	/// Resolve every field; an index built with another schema is reported as missing.
	pub fn from_schema(schema: &Schema) -> Result<Self> {
		let get = |name: &str| {
			schema.get_field(name).map_err(|_| Error::NotFound(format!("keyword index has no '{}' field; rebuild it with `medrag load`", name)))
		};
		Ok(Self {
			chunk_id: get("chunk_id")?,
			doc_id: get("doc_id")?,
			doc_version: get("doc_version")?,
			content_type: get("content_type")?,
			text: get("text")?,
			specialty: get("specialty")?,
			source_name: get("source_name")?,
			doc_type: get("doc_type")?,
			metadata: get("metadata")?,
		})
	}

	pub fn filter_field(&self, column: &str) -> Option<Field> {
		match column {
			"specialty" => Some(self.specialty),
			"source_name" => Some(self.source_name),
			"doc_type" => Some(self.doc_type),
			_ => None,
		}
	}

	pub fn record(&self, doc: &TantivyDocument) -> Result<ChunkRecord> {
		let text_of = |f: Field| doc.get_first(f).and_then(|v| v.as_str()).map(str::to_string);
		let chunk_id = text_of(self.chunk_id).ok_or_else(|| Error::Operation("keyword hit without chunk_id".into()))?;
		let metadata: ChunkMetadata = match text_of(self.metadata) {
			Some(json) => serde_json::from_str(&json).map_err(|e| Error::Operation(format!("bad metadata for chunk {}: {}", chunk_id, e)))?,
			None => ChunkMetadata::default(),
		};
		Ok(ChunkRecord {
			doc_id: text_of(self.doc_id).unwrap_or_default(),
			doc_version: text_of(self.doc_version).unwrap_or_default(),
			text: text_of(self.text).unwrap_or_default(),
			chunk_id,
			metadata,
		})
	}
}
