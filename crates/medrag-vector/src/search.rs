use std::path::PathBuf;
use std::time::Instant;

use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;

use medrag_core::traits::VectorStore;
use medrag_core::types::{ChunkMetadata, ChunkRecord, SearchFilters, VectorHit};
use medrag_core::{Error, Result};

use crate::table::{filter_predicate, open_db, table_exists};

/// Vector store over a local LanceDB table written by `LanceChunkWriter`.
///
/// Holds only the location; each `nearest` call opens its own connection,
/// which is dropped when the call returns.
#[derive(Debug, Clone)]
pub struct LanceVectorStore {
	db_path: PathBuf,
	table_name: String,
	dim: usize,
}

impl LanceVectorStore {
	pub fn new(db_path: impl Into<PathBuf>, table_name: &str, dim: usize) -> Self {
		Self { db_path: db_path.into(), table_name: table_name.to_string(), dim }
	}
}

fn op(e: impl std::fmt::Display) -> Error { Error::Operation(format!("lancedb: {}", e)) }

impl VectorStore for LanceVectorStore {
	fn dim(&self) -> usize { self.dim }

	async fn nearest(&self, embedding: &[f32], filters: &SearchFilters, limit: usize) -> Result<Vec<VectorHit>> {
		if embedding.len() != self.dim {
			return Err(Error::DimensionMismatch { expected: self.dim, actual: embedding.len() });
		}
		if limit == 0 { return Ok(Vec::new()); }
		let start = Instant::now();
		let db = open_db(self.db_path.to_string_lossy().as_ref()).await.map_err(op)?;
		if !table_exists(&db, &self.table_name).await.map_err(op)? {
			return Err(Error::NotFound(format!("vector table '{}' not found in {}; run `medrag load` to build it", self.table_name, self.db_path.display())));
		}
		let table = db.open_table(&self.table_name).execute().await.map_err(op)?;
		let mut query = table
			.vector_search(embedding.to_vec())
			.map_err(op)?
			.distance_type(DistanceType::Cosine)
			.limit(limit);
		if let Some(predicate) = filter_predicate(filters) { query = query.only_if(predicate); }
		let mut stream = query.execute().await.map_err(op)?;
		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(op)? {
			hits.extend(batch_hits(&batch)?);
		}
		hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
		hits.truncate(limit);
		tracing::debug!(hits = hits.len(), elapsed_ms = start.elapsed().as_millis() as u64, "vector search");
		Ok(hits)
	}
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| Error::NotFound(format!("vector table has no '{}' column; rebuild it with `medrag load`", name)))
}

fn batch_hits(batch: &RecordBatch) -> Result<Vec<VectorHit>> {
	let chunk_ids = string_column(batch, "chunk_id")?;
	let doc_ids = string_column(batch, "doc_id")?;
	let versions = string_column(batch, "doc_version")?;
	let texts = string_column(batch, "text")?;
	let metadata = string_column(batch, "metadata")?;
	let distances = batch
		.column_by_name("_distance")
		.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
		.ok_or_else(|| Error::Operation("vector search returned no _distance column".into()))?;

	let mut hits = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let chunk_id = chunk_ids.value(i).to_string();
		let meta: ChunkMetadata = if metadata.is_null(i) {
			ChunkMetadata::default()
		} else {
			serde_json::from_str(metadata.value(i)).map_err(|e| Error::Operation(format!("bad metadata for chunk {}: {}", chunk_id, e)))?
		};
		hits.push(VectorHit {
			record: ChunkRecord {
				chunk_id,
				doc_id: doc_ids.value(i).to_string(),
				doc_version: versions.value(i).to_string(),
				text: texts.value(i).to_string(),
				metadata: meta,
			},
			distance: distances.value(i),
		});
	}
	Ok(hits)
}
