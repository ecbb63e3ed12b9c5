use anyhow::Result;

use medrag_core::config::{expand_path, Settings};
use medrag_core::types::{CitedResult, SearchFilters};
use medrag_hybrid::{format_citation, render_context, Retriever};
use medrag_text::TantivyKeywordStore;
use medrag_vector::LanceVectorStore;

const SEPARATOR_WIDTH: usize = 49;

pub struct QueryArgs {
    pub query: String,
    pub top_k: Option<usize>,
    pub filters: SearchFilters,
    pub json: bool,
    pub context: bool,
}

pub async fn run(settings: Settings, args: QueryArgs) -> Result<()> {
    let top_k = args.top_k.unwrap_or(settings.retrieval.top_k);
    let vector = LanceVectorStore::new(expand_path(&settings.store.lancedb_dir), &settings.store.table, settings.embedding.dimension);
    let keyword = TantivyKeywordStore::new(expand_path(&settings.store.tantivy_dir));
    let retriever = Retriever::new(vector, keyword, settings)?;

    let results = retriever.retrieve(&args.query, &args.filters, top_k).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if args.context {
        println!("{}", render_context(&results));
    } else {
        print_results(&args.query, &results);
    }
    Ok(())
}

fn print_results(query: &str, results: &[CitedResult]) {
    let rule = "-".repeat(SEPARATOR_WIDTH);
    if results.is_empty() {
        println!("No results for \"{}\"", query);
        return;
    }
    println!("{} result(s) for \"{}\"", results.len(), query);
    for (i, r) in results.iter().enumerate() {
        println!("{rule}");
        let vector = r.vector_score.map_or_else(|| "-".to_string(), |s| format!("{:.3}", s));
        let keyword = r.keyword_rank.map_or_else(|| "-".to_string(), |s| format!("{:.3}", s));
        println!("[{}] rerank={:.3} rrf={:.4} vector={} keyword={}", i + 1, r.rerank_score, r.rrf_score, vector, keyword);
        println!("{}", r.text);
        println!("Source: {}", format_citation(&r.citation));
    }
    println!("{rule}");
}
