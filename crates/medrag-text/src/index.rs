use anyhow::Result;
use std::path::Path;
use tantivy::{Index, IndexWriter, TantivyDocument};

use medrag_core::types::Chunk;

use crate::tantivy_utils::{build_schema, register_tokenizer, ChunkFields};

/// Writes chunks into a fresh Tantivy index.
pub struct TantivyChunkIndexer {
	index: Index,
	fields: ChunkFields,
}

impl TantivyChunkIndexer {
	/// Recreates the index directory from scratch.
	pub fn create(index_dir: &Path) -> Result<Self> {
		let schema = build_schema();
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, schema.clone())?;
		register_tokenizer(&index);
		let fields = ChunkFields::from_schema(&schema)?;
		Ok(Self { index, fields })
	}

	/// Adds one batch and commits it. Returns the number of documents written.
	pub fn index_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
		let mut index_writer: IndexWriter = self.index.writer(50_000_000)?;
		let f = &self.fields;
		for c in chunks {
			let mut doc = TantivyDocument::default();
			doc.add_text(f.chunk_id, &c.chunk_id);
			doc.add_text(f.doc_id, &c.doc_id);
			doc.add_text(f.doc_version, &c.doc_version);
			doc.add_text(f.content_type, &c.content_type);
			doc.add_text(f.text, &c.text);
			if let Some(v) = &c.metadata.specialty { doc.add_text(f.specialty, v); }
			if let Some(v) = &c.metadata.source_name { doc.add_text(f.source_name, v); }
			if let Some(v) = &c.metadata.doc_type { doc.add_text(f.doc_type, v); }
			doc.add_text(f.metadata, serde_json::to_string(&c.metadata)?);
			index_writer.add_document(doc)?;
		}
		index_writer.commit()?;
		tracing::debug!(count = chunks.len(), "tantivy batch committed");
		Ok(chunks.len())
	}
}
