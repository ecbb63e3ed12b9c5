//! medrag-hybrid
//!
//! The retrieval pipeline: each stage is a plain function over the shared
//! types, and `Retriever` chains them with stage-labelled errors.

pub mod citation;
pub mod debug;
pub mod dedup;
pub mod filters;
pub mod fusion;
pub mod keyword;
pub mod query;
pub mod rerank;
pub mod retrieve;
pub mod vector;

pub use citation::{assemble_citations, format_citation, render_context};
pub use dedup::{deduplicate, jaccard};
pub use filters::{apply_filters, FilterConfig};
pub use fusion::reciprocal_rank_fusion;
pub use query::{expand_query, process_query};
pub use rerank::rerank;
pub use retrieve::{Backend, Retriever, SearchOutcome};
