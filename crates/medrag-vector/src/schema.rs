use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("chunk_id", DataType::Utf8, false),
		Field::new("doc_id", DataType::Utf8, false),
		Field::new("doc_version", DataType::Utf8, false),
		Field::new("content_type", DataType::Utf8, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("specialty", DataType::Utf8, true),
		Field::new("source_name", DataType::Utf8, true),
		Field::new("doc_type", DataType::Utf8, true),
		Field::new("metadata", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
