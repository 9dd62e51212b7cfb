// src/bin/exhibit_index.rs
use std::path::PathBuf;

use clap::Parser;

use edgar_exhibits::config::{
    ChunkConfig, EmbeddingArgs, DEFAULT_INDEX_DIR, DEFAULT_INDEX_SOURCE_DIRS, DEFAULT_METADATA_FILE,
};
use edgar_exhibits::rag::{build_index, discover_documents, ticker_map, Embedder, OpenAiEmbedder, VectorStore};
use edgar_exhibits::utils::{logging, AppError};

/// Chunks and embeds downloaded exhibits into the on-disk vector index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Document roots to index (repeatable)
    #[arg(long = "root", default_values = DEFAULT_INDEX_SOURCE_DIRS)]
    roots: Vec<PathBuf>,

    /// Metadata JSONL used to tag chunks with tickers
    #[arg(long, default_value = DEFAULT_METADATA_FILE)]
    metadata: PathBuf,

    /// Index directory; new chunks are appended
    #[arg(long, default_value = DEFAULT_INDEX_DIR)]
    db: PathBuf,

    #[arg(long, default_value_t = 1500)]
    chunk_size: usize,

    #[arg(long, default_value_t = 200)]
    chunk_overlap: usize,

    #[command(flatten)]
    embedding: EmbeddingArgs,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    logging::setup_logging();
    let args = Args::parse();

    if args.chunk_overlap >= args.chunk_size {
        return Err(AppError::Config("--chunk-overlap must be smaller than --chunk-size".to_string()));
    }

    let tickers = ticker_map(&args.metadata);
    tracing::info!("Loaded {} ticker tag(s) from {}", tickers.len(), args.metadata.display());

    let documents = discover_documents(&args.roots);
    tracing::info!("Found {} document(s)", documents.len());

    let embedder = OpenAiEmbedder::new(args.embedding.into_config())?;
    let mut store = VectorStore::create(&args.db)?;
    store.check_model(embedder.model())?;
    let chunking = ChunkConfig { chunk_size: args.chunk_size, chunk_overlap: args.chunk_overlap };

    let stats = build_index(&documents, &tickers, &mut store, &embedder, chunking).await?;
    tracing::info!(
        "Vector index at {}/ now holds {} chunk(s) ({} added from {} document(s))",
        store.dir().display(),
        store.len(),
        stats.chunks,
        stats.documents
    );
    Ok(())
}
