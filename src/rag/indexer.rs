// src/rag/indexer.rs
//! Document discovery and index building.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::chunker::split_text;
use super::embedder::Embedder;
use super::store::{IndexEntry, VectorStore};
use crate::config::ChunkConfig;
use crate::extractors::exhibits::is_html;
use crate::extractors::text::html_to_text;
use crate::metadata::read_metadata;
use crate::utils::error::RagError;

const INDEXED_EXTENSIONS: &[&str] = &["htm", "html", "txt"];

/// `.htm`, `.html` and `.txt` files under each existing root, sorted per root.
pub fn discover_documents(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for root in roots {
        if !root.is_dir() {
            tracing::debug!("Skipping missing root {}", root.display());
            continue;
        }
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| INDEXED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            })
            .collect();
        files.sort();
        found.extend(files);
    }
    found
}

/// Plain text of a document; HTML is stripped, anything else is read as-is.
pub fn load_document(path: &Path) -> Result<String, RagError> {
    let bytes = std::fs::read(path)?;
    let raw = String::from_utf8_lossy(&bytes);
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    Ok(if is_html(&name) { html_to_text(&raw) } else { raw.into_owned() })
}

/// `html_file → ticker` from a metadata file; an absent or unreadable file
/// gives an empty map.
pub fn ticker_map(metadata: &Path) -> HashMap<String, String> {
    if !metadata.exists() {
        return HashMap::new();
    }
    match read_metadata(metadata) {
        Ok(records) => records.into_iter().map(|r| (r.html_file, r.ticker)).collect(),
        Err(e) => {
            tracing::warn!("Ignoring metadata {}: {}", metadata.display(), e);
            HashMap::new()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
}

struct PendingChunk {
    source: String,
    chunk: usize,
    ticker: Option<String>,
    text: String,
}

async fn flush<E: Embedder>(
    pending: &mut Vec<PendingChunk>,
    store: &mut VectorStore,
    embedder: &E,
) -> Result<(), RagError> {
    if pending.is_empty() {
        return Ok(());
    }
    let texts: Vec<String> = pending.iter().map(|p| p.text.clone()).collect();
    let vectors = embedder.embed(&texts).await?;
    if vectors.len() != pending.len() {
        return Err(RagError::Format(format!("{} vectors for {} chunks", vectors.len(), pending.len())));
    }
    let entries: Vec<IndexEntry> = pending
        .drain(..)
        .zip(vectors)
        .map(|(p, embedding)| IndexEntry {
            source: p.source,
            chunk: p.chunk,
            ticker: p.ticker,
            text: p.text,
            embedding,
        })
        .collect();
    store.append(embedder.model(), &entries)
}

/// Chunks every discovered document and appends the embedded chunks to
/// `store` in batches of the embedder's size.
pub async fn build_index<E: Embedder>(
    documents: &[PathBuf],
    tickers: &HashMap<String, String>,
    store: &mut VectorStore,
    embedder: &E,
    chunking: ChunkConfig,
) -> Result<IndexStats, RagError> {
    let mut stats = IndexStats::default();
    let mut pending = Vec::new();

    for path in documents {
        let text = match load_document(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        stats.documents += 1;

        let source = path.display().to_string();
        let ticker = tickers.get(&source).cloned();
        for (chunk, text) in split_text(&text, chunking).into_iter().enumerate() {
            pending.push(PendingChunk { source: source.clone(), chunk, ticker: ticker.clone(), text });
            stats.chunks += 1;
            if pending.len() >= embedder.batch_size() {
                flush(&mut pending, store, embedder).await?;
            }
        }
    }
    flush(&mut pending, store, embedder).await?;

    tracing::info!("Indexed {} chunk(s) from {} document(s)", stats.chunks, stats.documents);
    Ok(stats)
}
