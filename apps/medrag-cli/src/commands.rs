//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "medrag")]
#[command(about = "Hybrid retrieval over clinical guideline chunks")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load ingested chunks (JSON lines) into the vector and keyword stores
    Load {
        /// File with one chunk record per line
        input: PathBuf,
        /// Chunks written per store batch
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
    },
    /// Retrieve cited passages for a clinical question
    Query {
        /// The question to search for
        query: String,
        /// Number of passages to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(long)]
        specialty: Option<String>,
        #[arg(long)]
        source_name: Option<String>,
        #[arg(long)]
        doc_type: Option<String>,
        /// Minimum vector similarity for candidates that have one
        #[arg(long)]
        score_threshold: Option<f32>,
        /// Jaccard similarity at which passages count as duplicates
        #[arg(long)]
        similarity_threshold: Option<f32>,
        #[arg(long)]
        rrf_k: Option<u32>,
        /// Restrict to these content types (text, table)
        #[arg(long, value_delimiter = ',')]
        content_types: Option<Vec<String>>,
        /// Disable abbreviation expansion
        #[arg(long)]
        no_expand: bool,
        /// Write per-stage JSON artifacts
        #[arg(long)]
        debug: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Print the numbered context block instead of the result list
        #[arg(long, conflicts_with = "json")]
        context: bool,
    },
}
