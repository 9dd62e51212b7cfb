// src/config.rs
//! Tunables shared by the binaries. Defaults mirror the constants the
//! downloader has always used; every field can be overridden from the CLI.

use std::path::PathBuf;
use std::time::Duration;

// IMPORTANT: Replace with your actual details or set EDGAR_USER_AGENT.
pub const DEFAULT_USER_AGENT: &str = "EdgarExhibits research contact@example.com EDGARFetcher/1.0";

/// Root folders the downloader has historically written into.
pub const DEFAULT_EXHIBIT_DIRS: &[&str] = &[
    "EDGAR_EXHIBITS",
    "EDGAR_EXHIBITS_2020_2025",
    "EDGAR_EXHIBITS_2024_2025",
];

/// Roots scanned by the index builder.
pub const DEFAULT_INDEX_SOURCE_DIRS: &[&str] = &["EDGAR_EXHIBITS_2020_2025", "EDGAR_EXHIBITS_2024_2025"];

pub const DEFAULT_METADATA_FILE: &str = "ex21_metadata.jsonl";
pub const DEFAULT_INDEX_DIR: &str = "merger_db";

/// HTTP behaviour for every EDGAR request.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Total attempts per request, including the first.
    pub retries: u32,
    /// Base sleep; backoff after attempt `n` is `sleep * n * 2`.
    pub sleep: Duration,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retries: 3,
            sleep: Duration::from_millis(250),
            timeout: Duration::from_secs(60),
        }
    }
}

impl FetchConfig {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.sleep * attempt * 2
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Minimum similarity ratio accepted by the fuzzy name tier.
    pub fuzzy_threshold: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { fuzzy_threshold: 0.90 }
    }
}

#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub roots: Vec<PathBuf>,
    pub output: PathBuf,
    /// Maximum characters of extracted text kept per record.
    pub max_chars: usize,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            roots: DEFAULT_EXHIBIT_DIRS.iter().map(PathBuf::from).collect(),
            output: PathBuf::from(DEFAULT_METADATA_FILE),
            max_chars: 8000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
        }
    }
}

pub const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TOP_K: usize = 6;

/// OpenAI-compatible `/embeddings` endpoint. The key is optional so local
/// servers that ignore auth work too.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: None,
            batch_size: 64,
            max_retries: 3,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Embedding endpoint flags shared by the index builder and the ask tool.
#[derive(Debug, Clone, clap::Args)]
pub struct EmbeddingArgs {
    /// OpenAI-compatible API base URL
    #[arg(long, env = "EMBEDDING_BASE_URL", default_value = DEFAULT_EMBEDDING_BASE_URL)]
    pub embedding_base_url: String,

    /// Embedding model name
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// API key; falls back to OPENAI_API_KEY
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    pub embedding_api_key: Option<String>,

    /// Inputs per embeddings request
    #[arg(long, default_value_t = 64)]
    pub embedding_batch_size: usize,
}

impl EmbeddingArgs {
    pub fn into_config(self) -> EmbeddingConfig {
        let api_key = self.embedding_api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok());
        EmbeddingConfig {
            base_url: self.embedding_base_url,
            model: self.embedding_model,
            api_key,
            batch_size: self.embedding_batch_size,
            ..EmbeddingConfig::default()
        }
    }
}

/// OpenAI-compatible chat completions endpoint (Groq by default).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key,
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }
}
