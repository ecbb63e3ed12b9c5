use anyhow::{anyhow, Result};
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use lancedb::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use medrag_core::types::Chunk;

use crate::schema::build_chunk_schema;
use crate::table::{open_db, remove_local_table, table_exists};

/// Appends chunk rows (with their precomputed embeddings) to a LanceDB table.
pub struct LanceChunkWriter {
	db: Connection,
	db_path: PathBuf,
	table_name: String,
	dim: usize,
}

impl LanceChunkWriter {
	pub async fn new(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		std::fs::create_dir_all(db_path)?;
		let db = open_db(db_path.to_string_lossy().as_ref()).await?;
		Ok(Self { db, db_path: db_path.to_path_buf(), table_name: table_name.to_string(), dim })
	}

	/// Drops any existing table so a load replaces the store contents.
	pub fn reset(&self) -> Result<()> {
		remove_local_table(&self.db_path, &self.table_name)?;
		tracing::debug!(table = %self.table_name, "lancedb table reset");
		Ok(())
	}

	pub async fn write_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
		if chunks.is_empty() { return Ok(0); }
		if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != self.dim) {
			return Err(anyhow!("chunk {} has a {}-dim embedding, table expects {}", bad.chunk_id, bad.embedding.len(), self.dim));
		}
		let record_batch = self.to_record_batch(chunks)?; let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		if table_exists(&self.db, &self.table_name).await? {
			self.db.open_table(&self.table_name).execute().await?.add(reader).execute().await?;
		} else {
			self.db.create_table(&self.table_name, reader).execute().await?;
		}
		tracing::debug!(count = chunks.len(), table = %self.table_name, "lancedb batch written");
		Ok(chunks.len())
	}

	fn to_record_batch(&self, chunks: &[Chunk]) -> Result<RecordBatch> {
		let dim = i32::try_from(self.dim)?;
		let schema = build_chunk_schema(dim);
		let mut chunk_ids = Vec::new(); let mut doc_ids = Vec::new(); let mut versions = Vec::new(); let mut content_types = Vec::new(); let mut texts = Vec::new();
		let mut specialties = Vec::new(); let mut sources = Vec::new(); let mut doc_types = Vec::new(); let mut metadata = Vec::new();
		let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
		for c in chunks {
			chunk_ids.push(c.chunk_id.clone()); doc_ids.push(c.doc_id.clone()); versions.push(c.doc_version.clone()); content_types.push(c.content_type.clone()); texts.push(c.text.clone());
			specialties.push(c.metadata.specialty.clone()); sources.push(c.metadata.source_name.clone()); doc_types.push(c.metadata.doc_type.clone());
			metadata.push(serde_json::to_string(&c.metadata)?);
			vectors.push(Some(c.embedding.iter().map(|&x| Some(x)).collect()));
		}
		let record_batch = RecordBatch::try_new(schema, vec![
			Arc::new(StringArray::from(chunk_ids)),
			Arc::new(StringArray::from(doc_ids)),
			Arc::new(StringArray::from(versions)),
			Arc::new(StringArray::from(content_types)),
			Arc::new(StringArray::from(texts)),
			Arc::new(StringArray::from(specialties)),
			Arc::new(StringArray::from(sources)),
			Arc::new(StringArray::from(doc_types)),
			Arc::new(StringArray::from(metadata)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
		])?;
		Ok(record_batch)
	}
}
