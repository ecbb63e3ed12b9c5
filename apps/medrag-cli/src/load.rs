use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use medrag_core::config::{expand_path, Settings};
use medrag_core::models::ModelRegistry;
use medrag_core::types::{Chunk, CONTENT_TYPES};
use medrag_text::TantivyChunkIndexer;
use medrag_vector::LanceChunkWriter;

/// Parse one chunk per non-blank line, filling `metadata.content_type` from
/// the chunk when absent.
pub fn read_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let file = std::fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut chunks = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let mut chunk: Chunk = serde_json::from_str(&line).with_context(|| format!("{}:{}: invalid chunk record", path.display(), i + 1))?;
        if !CONTENT_TYPES.contains(&chunk.content_type.as_str()) {
            bail!("{}:{}: chunk {} has content_type '{}', expected one of {:?}", path.display(), i + 1, chunk.chunk_id, chunk.content_type, CONTENT_TYPES);
        }
        if chunk.metadata.content_type.is_none() {
            chunk.metadata.content_type = Some(chunk.content_type.clone());
        }
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Embed chunks that arrived without a vector; reject vectors of the wrong size.
fn ensure_embeddings(chunks: &mut [Chunk], settings: &Settings) -> Result<()> {
    let dim = settings.embedding.dimension;
    let missing: Vec<usize> = chunks.iter().enumerate().filter(|(_, c)| c.embedding.is_empty()).map(|(i, _)| i).collect();
    if !missing.is_empty() {
        tracing::info!(count = missing.len(), model = %settings.embedding.model, "embedding chunks without vectors");
        let embedder = ModelRegistry::shared().embedder.get_or_load(&settings.embedding.model, |_| medrag_embed::load_embedder(&settings.embedding))?;
        for batch in missing.chunks(64) {
            let texts: Vec<String> = batch.iter().map(|&i| chunks[i].text.clone()).collect();
            let vectors = embedder.embed_batch(&texts)?;
            for (&i, v) in batch.iter().zip(vectors) { chunks[i].embedding = v; }
        }
    }
    if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dim) {
        return Err(anyhow!("chunk {} has a {}-dim embedding, embedding.dimension is {}", bad.chunk_id, bad.embedding.len(), dim));
    }
    Ok(())
}

pub async fn run(settings: &Settings, input: &Path, batch_size: usize) -> Result<()> {
    let mut chunks = read_chunks(input)?;
    if chunks.is_empty() {
        println!("No chunks found in {}", input.display());
        return Ok(());
    }
    ensure_embeddings(&mut chunks, settings)?;

    let store = &settings.store;
    let tantivy_dir = expand_path(&store.tantivy_dir);
    let lancedb_dir = expand_path(&store.lancedb_dir);
    println!("Loading {} chunks from {}", chunks.len(), input.display());
    println!("  keyword index: {}", tantivy_dir.display());
    println!("  vector table:  {} ({})", lancedb_dir.display(), store.table);

    let indexer = TantivyChunkIndexer::create(&tantivy_dir)?;
    let writer = LanceChunkWriter::new(&lancedb_dir, &store.table, settings.embedding.dimension).await?;
    writer.reset()?;

    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?.progress_chars("#>-"));
    let mut written = 0usize;
    for batch in chunks.chunks(batch_size.max(1)) {
        indexer.index_chunks(batch)?;
        writer.write_chunks(batch).await?;
        written += batch.len();
        pb.set_position(written as u64);
    }
    pb.finish_with_message("done");
    println!("Loaded {} chunks into both stores", written);
    Ok(())
}
