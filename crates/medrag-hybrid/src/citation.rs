//! Citation assembly and rendering.

use medrag_core::types::{Citation, CitedResult, ChunkMetadata, RankedResult};
use medrag_core::{Error, Result};

pub const UNKNOWN_SECTION: &str = "Unknown section";

fn required(meta_value: &Option<String>, chunk_id: &str, field: &'static str) -> Result<String> {
    match meta_value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(Error::MissingCitationField { chunk_id: chunk_id.to_string(), field }),
    }
}

fn citation_for(r: &RankedResult) -> Result<Citation> {
    let m: &ChunkMetadata = &r.metadata;
    let id = r.chunk_id.as_str();
    let mut section_path: Vec<String> = m.section_path.iter().filter(|s| !s.trim().is_empty()).cloned().collect();
    if section_path.is_empty() {
        section_path.push(UNKNOWN_SECTION.to_string());
    }
    Ok(Citation {
        title: required(&m.title, id, "title")?,
        source_name: required(&m.source_name, id, "source_name")?,
        specialty: required(&m.specialty, id, "specialty")?,
        doc_type: required(&m.doc_type, id, "doc_type")?,
        source_url: required(&m.source_url, id, "source_url")?,
        content_type: required(&m.content_type, id, "content_type")?,
        section_title: required(&m.section_title, id, "section_title")?,
        section_path,
        page_start: m.page_start.unwrap_or(0),
        page_end: m.page_end.unwrap_or(0),
        doc_id: r.doc_id.clone(),
        chunk_id: r.chunk_id.clone(),
    })
}

/// Attach a complete citation to every result, in order.
///
/// Fails on the first result missing a required metadata field.
pub fn assemble_citations(results: Vec<RankedResult>) -> Result<Vec<CitedResult>> {
    results
        .into_iter()
        .map(|r| {
            let citation = citation_for(&r)?;
            Ok(CitedResult {
                chunk_id: r.chunk_id,
                text: r.text,
                rerank_score: r.rerank_score,
                rrf_score: r.rrf_score,
                vector_score: r.vector_score,
                keyword_rank: r.keyword_rank,
                citation,
            })
        })
        .collect()
}

/// Same as `Citation`'s `Display`.
pub fn format_citation(c: &Citation) -> String {
    c.to_string()
}

/// Numbered passages with their source, ready to ground a generator prompt.
pub fn render_context(results: &[CitedResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let source = match r.citation.page_note() {
                Some(pages) => format!("{} ({})", r.citation.source_name, pages),
                None => r.citation.source_name.clone(),
            };
            format!("[{}] {}\nSource: {}", i + 1, r.text, source)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
