//! Domain types shared by the stores and the retrieval pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Allowed values for `content_type`.
pub const CONTENT_TYPES: [&str; 2] = ["text", "table"];

/// Provenance attached to every chunk by the ingestion pipeline.
///
/// Fields are optional because the store does not enforce them; the citation
/// assembler decides which ones are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub specialty: Option<String>,
    pub source_name: Option<String>,
    pub doc_type: Option<String>,
    pub title: Option<String>,
    pub author_org: Option<String>,
    pub source_url: Option<String>,
    #[serde(default)]
    pub section_path: Vec<String>,
    pub section_title: Option<String>,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,
    pub content_type: Option<String>,
}

/// A stored chunk as produced by the offline ingestion pipeline.
///
/// - `chunk_id`: content hash, unique within `(doc_id, doc_version)`
/// - `embedding`: L2-normalized vector of the store's configured dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub doc_version: String,
    pub content_type: String,
    pub text: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// The chunk fields a store returns with each hit (everything but the vector).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub doc_version: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl From<&Chunk> for ChunkRecord {
    fn from(c: &Chunk) -> Self {
        Self {
            chunk_id: c.chunk_id.clone(),
            doc_id: c.doc_id.clone(),
            doc_version: c.doc_version.clone(),
            text: c.text.clone(),
            metadata: c.metadata.clone(),
        }
    }
}

/// Optional equality filters pushed down to both stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub specialty: Option<String>,
    pub source_name: Option<String>,
    pub doc_type: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.specialty.is_none() && self.source_name.is_none() && self.doc_type.is_none()
    }

    /// `(column, value)` pairs for the filters that are set.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        if let Some(v) = &self.specialty { out.push(("specialty", v.as_str())); }
        if let Some(v) = &self.source_name { out.push(("source_name", v.as_str())); }
        if let Some(v) = &self.doc_type { out.push(("doc_type", v.as_str())); }
        out
    }

    pub fn matches(&self, meta: &ChunkMetadata) -> bool {
        let eq = |want: &Option<String>, have: &Option<String>| want.as_ref().map_or(true, |w| have.as_ref() == Some(w));
        eq(&self.specialty, &meta.specialty) && eq(&self.source_name, &meta.source_name) && eq(&self.doc_type, &meta.doc_type)
    }
}

/// Raw nearest-neighbour hit: cosine distance as reported by the store.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub record: ChunkRecord,
    pub distance: f32,
}

/// Raw full-text hit: the store's rank value, higher is better.
#[derive(Debug, Clone)]
pub struct KeywordHit {
    pub record: ChunkRecord,
    pub rank: f32,
}

/// Query after validation and expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedQuery {
    pub original: String,
    pub expanded: String,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub embedding_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchResult {
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub text: String,
    /// Cosine similarity in `[0, 1]`.
    pub score: f32,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordSearchResult {
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub text: String,
    pub rank: f32,
    pub metadata: ChunkMetadata,
}

/// A candidate after reciprocal rank fusion.
///
/// `vector_score`/`keyword_rank` are `None` when that backend did not return
/// the chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub text: String,
    pub rrf_score: f64,
    pub vector_score: Option<f32>,
    pub keyword_rank: Option<f32>,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub text: String,
    /// Sigmoid of the cross-encoder logit, in `[0, 1]`.
    pub rerank_score: f32,
    pub rrf_score: f64,
    pub vector_score: Option<f32>,
    pub keyword_rank: Option<f32>,
    pub metadata: ChunkMetadata,
}

/// Complete provenance for one passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub source_name: String,
    pub specialty: String,
    pub doc_type: String,
    pub section_path: Vec<String>,
    pub section_title: String,
    pub page_start: u32,
    pub page_end: u32,
    pub source_url: String,
    pub doc_id: String,
    pub chunk_id: ChunkId,
    pub content_type: String,
}

impl Citation {
    /// "page 4" or "pages 4-6"; `None` when the page is unknown.
    pub fn page_note(&self) -> Option<String> {
        match (self.page_start, self.page_end) {
            (0, _) => None,
            (start, end) if end > start => Some(format!("pages {}-{}", start, end)),
            (start, _) => Some(format!("page {}", start)),
        }
    }
}

/// One-line reference: title, source, section path, pages, URL.
impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}. {}", self.title, self.source_name, self.section_path.join(" > "))?;
        if let Some(pages) = self.page_note() {
            write!(f, ", {}", pages)?;
        }
        write!(f, ". {}", self.source_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitedResult {
    pub chunk_id: ChunkId,
    pub text: String,
    pub rerank_score: f32,
    pub rrf_score: f64,
    pub vector_score: Option<f32>,
    pub keyword_rank: Option<f32>,
    pub citation: Citation,
}
