mod commands;
mod load;
mod query;

use anyhow::Result;
use clap::Parser;

use medrag_core::config::Config;
use medrag_core::logging;
use medrag_core::types::SearchFilters;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Config::load()?.settings()?;
    if cli.verbose {
        settings.logging.level = "debug".to_string();
    }
    logging::init(&settings.logging);

    match cli.command {
        Commands::Load { input, batch_size } => load::run(&settings, &input, batch_size).await,
        Commands::Query {
            query,
            top_k,
            specialty,
            source_name,
            doc_type,
            score_threshold,
            similarity_threshold,
            rrf_k,
            content_types,
            no_expand,
            debug,
            json,
            context,
        } => {
            let retrieval = &mut settings.retrieval;
            if let Some(v) = score_threshold { retrieval.score_threshold = v; }
            if let Some(v) = similarity_threshold { retrieval.similarity_threshold = v; }
            if let Some(v) = rrf_k { retrieval.rrf_k = v; }
            if content_types.is_some() { retrieval.content_types = content_types; }
            if no_expand { retrieval.expand = false; }
            if debug { settings.debug.enabled = true; }
            let filters = SearchFilters { specialty, source_name, doc_type };
            query::run(settings, query::QueryArgs { query, top_k, filters, json, context }).await
        }
    }
}
