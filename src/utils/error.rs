// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error {status} for {url}")]
    Http { status: reqwest::StatusCode, url: String },

    #[error("SEC Rate limit likely exceeded")]
    RateLimited, // 403 from EDGAR usually means a bad User-Agent or too many requests

    #[error("Could not find document: {0}")]
    NotFound(String),

    #[error("GET {url} failed after {attempts} attempts: {last}")]
    RetriesExhausted { url: String, attempts: u32, last: String },

    #[error("Failed to parse EDGAR response: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Ticker {0:?} not found in SEC mapping")]
    TickerNotFound(String),

    #[error("No CIK match for company name {0:?}")]
    NameNotFound(String),

    #[error("Lookup table unavailable: {0}")]
    Lookup(#[from] EdgarError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No PDF engine found. Install wkhtmltopdf or Chrome/Edge.")]
    NoEngine,

    #[error("[{engine}] {message}")]
    Failed { engine: &'static str, message: String },
}

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Vector index not found at {0}. Run exhibit-index first.")]
    IndexMissing(String),

    #[error("{0} missing (set it in the environment or .env)")]
    MissingCredential(&'static str),

    #[error("Model API request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Model API returned {status}: {body}")]
    Api { status: reqwest::StatusCode, body: String },

    #[error("Embedding dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index was built with embedding model {expected:?}, not {actual:?}")]
    ModelMismatch { expected: String, actual: String },

    #[error("Index database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Index format error: {0}")]
    Format(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError), // Automatically convert Edgar errors

    #[error("Identifier resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Retrieval failed: {0}")]
    Rag(#[from] RagError),

    #[error("Deal sheet error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Deal workbook error: {0}")]
    Sheet(#[from] calamine::Error),

    #[error("Data processing failed: {0}")]
    Processing(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::Format(err.to_string())
    }
}
