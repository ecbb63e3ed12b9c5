//! medrag-text
//!
//! Tantivy-backed keyword side of the chunk store: `index` writes chunks,
//! `search` implements `KeywordStore` with stemmed conjunctive BM25 matching.
pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::TantivyChunkIndexer;
pub use search::TantivyKeywordStore;
