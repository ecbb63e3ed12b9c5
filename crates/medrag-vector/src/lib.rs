//! medrag-vector
//!
//! LanceDB-backed nearest-neighbour side of the chunk store: `writer` loads
//! chunk rows, `search` implements `VectorStore` with cosine distance and
//! pushed-down metadata filters.
pub mod schema;
pub mod table;
pub mod writer;
pub mod search;

pub use search::LanceVectorStore;
pub use writer::LanceChunkWriter;
