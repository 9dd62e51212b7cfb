// src/rag/store.rs
//! On-disk vector index: one SQLite file holding the chunks, their
//! embeddings, and the manifest. Search is brute-force cosine similarity.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::utils::error::RagError;

const DB_FILE: &str = "index.sqlite3";
const MANIFEST_KEY: &str = "manifest";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        ticker TEXT,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE TABLE IF NOT EXISTS config (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Path of the document the chunk came from.
    pub source: String,
    pub chunk: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    pub text: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub model: String,
    pub dimensions: usize,
    pub entries: usize,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub score: f32,
    pub entry: IndexEntry,
}

pub struct VectorStore {
    conn: Connection,
    dir: PathBuf,
    manifest: Option<Manifest>,
}

impl VectorStore {
    /// Opens an existing index for querying.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, RagError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.join(DB_FILE).is_file() {
            return Err(RagError::IndexMissing(dir.display().to_string()));
        }
        Self::connect(dir)
    }

    /// Opens the index for writing, creating the directory and tables if needed.
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self, RagError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Self::connect(dir)
    }

    fn connect(dir: PathBuf) -> Result<Self, RagError> {
        let conn = Connection::open(dir.join(DB_FILE))?;
        conn.execute_batch(SCHEMA)?;
        let manifest = read_manifest(&conn)?;
        Ok(Self { conn, dir, manifest })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn len(&self) -> usize {
        self.manifest.as_ref().map_or(0, |m| m.entries)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fails when the index was built with a different embedding model.
    pub fn check_model(&self, model: &str) -> Result<(), RagError> {
        match &self.manifest {
            Some(m) if m.model != model => {
                Err(RagError::ModelMismatch { expected: m.model.clone(), actual: model.to_string() })
            }
            _ => Ok(()),
        }
    }

    /// Appends entries and updates the manifest in one transaction. Every
    /// vector must match the index dimension, which the first append fixes.
    pub fn append(&mut self, model: &str, entries: &[IndexEntry]) -> Result<(), RagError> {
        let Some(first) = entries.first() else {
            return Ok(());
        };
        self.check_model(model)?;
        let dimensions = self.manifest.as_ref().map_or(first.embedding.len(), |m| m.dimensions);
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(RagError::DimensionMismatch { expected: dimensions, actual: bad.embedding.len() });
        }

        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO chunks (source, chunk_index, ticker, content, embedding) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for entry in entries {
                insert.execute(params![
                    entry.source,
                    entry.chunk as i64,
                    entry.ticker,
                    entry.text,
                    serialize_embedding(&entry.embedding),
                ])?;
            }
        }
        let count: i64 = tx.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        let manifest = Manifest {
            model: model.to_string(),
            dimensions,
            entries: count as usize,
            updated_at: Utc::now(),
        };
        tx.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![MANIFEST_KEY, serde_json::to_string(&manifest)?],
        )?;
        tx.commit()?;

        self.manifest = Some(manifest);
        Ok(())
    }

    /// The `k` entries most similar to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredEntry>, RagError> {
        if let Some(m) = &self.manifest {
            if m.dimensions != query.len() {
                return Err(RagError::DimensionMismatch { expected: m.dimensions, actual: query.len() });
            }
        }

        let mut stmt = self
            .conn
            .prepare("SELECT source, chunk_index, ticker, content, embedding FROM chunks ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(IndexEntry {
                    source: row.get(0)?,
                    chunk: row.get::<_, i64>(1)? as usize,
                    ticker: row.get(2)?,
                    text: row.get(3)?,
                    embedding: deserialize_embedding(&row.get::<_, Vec<u8>>(4)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut scored: Vec<ScoredEntry> = rows
            .into_iter()
            .map(|entry| ScoredEntry { score: cosine_similarity(query, &entry.embedding), entry })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

fn read_manifest(conn: &Connection) -> Result<Option<Manifest>, RagError> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM config WHERE key = ?1", params![MANIFEST_KEY], |row| row.get(0))
        .optional()?;
    Ok(match raw {
        Some(json) => Some(serde_json::from_str(&json)?),
        None => None,
    })
}

/// f32 little-endian.
fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    dot / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry { source: source.into(), chunk: 0, ticker: None, text: source.into(), embedding }
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn embeddings_survive_blob_encoding() {
        let v = vec![0.25, -1.5, 3.0e-7];
        assert_eq!(deserialize_embedding(&serialize_embedding(&v)), v);
    }

    #[test]
    fn open_requires_existing_index() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorStore::open(dir.path().join("merger_db")).err().unwrap();
        assert!(matches!(err, RagError::IndexMissing(_)));

        // An empty directory is not an index either.
        let err = VectorStore::open(dir.path()).err().unwrap();
        assert!(matches!(err, RagError::IndexMissing(_)));
    }

    #[test]
    fn appends_accumulate_and_search_ranks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merger_db");

        let mut store = VectorStore::create(&path).unwrap();
        store.append("m", &[entry("a", vec![1.0, 0.0]), entry("b", vec![0.0, 1.0])]).unwrap();
        drop(store);

        let mut store = VectorStore::create(&path).unwrap();
        assert_eq!(store.len(), 2);
        store.append("m", &[entry("c", vec![1.0, 1.0])]).unwrap();
        drop(store);

        let store = VectorStore::open(&path).unwrap();
        assert_eq!(store.manifest().unwrap().entries, 3);
        assert_eq!(store.manifest().unwrap().dimensions, 2);

        let hits = store.search(&[1.0, 0.1], 2).unwrap();
        let sources: Vec<_> = hits.iter().map(|h| h.entry.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "c"]);
    }

    #[test]
    fn rejected_append_leaves_index_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::create(dir.path()).unwrap();
        store.append("m", &[entry("a", vec![1.0, 0.0])]).unwrap();

        let err = store.append("m", &[entry("b", vec![1.0, 0.0, 0.0])]).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
        assert!(matches!(
            store.search(&[1.0], 3).unwrap_err(),
            RagError::DimensionMismatch { expected: 2, actual: 1 }
        ));

        let err = store.append("other-model", &[entry("c", vec![0.0, 1.0])]).unwrap_err();
        assert!(matches!(err, RagError::ModelMismatch { .. }));
        drop(store);

        // Manifest count and stored rows agree after the failures.
        let store = VectorStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.search(&[1.0, 0.0], 10).unwrap().len(), 1);
    }

    #[test]
    fn model_check_compares_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::create(dir.path()).unwrap();
        assert!(store.check_model("anything").is_ok());

        store.append("text-embedding-3-small", &[entry("a", vec![1.0])]).unwrap();
        assert!(store.check_model("text-embedding-3-small").is_ok());
        assert!(matches!(
            store.check_model("nomic-embed-text"),
            Err(RagError::ModelMismatch { .. })
        ));
    }

    #[test]
    fn tickers_and_chunk_numbers_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::create(dir.path()).unwrap();
        let stored = IndexEntry {
            source: "EDGAR_EXHIBITS/DIS/EX-2.1__acc__d1.htm".into(),
            chunk: 7,
            ticker: Some("DIS".into()),
            text: "Agreement and Plan of Merger".into(),
            embedding: vec![0.5, 0.5],
        };
        store.append("m", &[stored.clone()]).unwrap();

        let hits = store.search(&[1.0, 1.0], 1).unwrap();
        assert_eq!(hits[0].entry, stored);
    }
}
