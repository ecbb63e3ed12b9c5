use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Model load failed for '{model}': {message}")]
    ModelLoad { model: String, message: String },

    #[error("Embedding dimension mismatch: store expects {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Chunk '{chunk_id}' is missing required citation field '{field}'")]
    MissingCitationField { chunk_id: String, field: &'static str },
}

impl Error {
    /// Validation failures are rejected before any I/O and are never retried.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidQuery(_) | Error::InvalidConfig(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Query,
    Search,
    Fusion,
    Filters,
    Rerank,
    Dedup,
    Citations,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Query => "QUERY",
            Stage::Search => "SEARCH",
            Stage::Fusion => "FUSION",
            Stage::Filters => "FILTERS",
            Stage::Rerank => "RERANK",
            Stage::Dedup => "DEDUP",
            Stage::Citations => "CITATIONS",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A stage failure as seen by callers of `retrieve`.
#[derive(Debug, Error)]
#[error("[{stage}] {source} (query: {query:?})")]
pub struct RetrievalError {
    pub stage: Stage,
    pub query: String,
    #[source]
    pub source: Error,
}

impl RetrievalError {
    pub fn new(stage: Stage, query: impl Into<String>, source: Error) -> Self {
        Self { stage, query: query.into(), source }
    }

    pub fn is_validation(&self) -> bool { self.source.is_validation() }
}
