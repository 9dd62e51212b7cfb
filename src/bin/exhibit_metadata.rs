// src/bin/exhibit_metadata.rs
use std::path::PathBuf;

use clap::Parser;

use edgar_exhibits::config::{MetadataConfig, DEFAULT_EXHIBIT_DIRS, DEFAULT_METADATA_FILE};
use edgar_exhibits::metadata::build_metadata;
use edgar_exhibits::utils::{logging, AppError};

/// Builds a JSONL record (ticker, files, extracted text) for every downloaded exhibit.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Exhibit roots to scan (repeatable)
    #[arg(long = "root", default_values = DEFAULT_EXHIBIT_DIRS)]
    roots: Vec<PathBuf>,

    /// Output JSONL file, rewritten each run
    #[arg(short, long, default_value = DEFAULT_METADATA_FILE)]
    output: PathBuf,

    /// Characters of extracted text kept per exhibit
    #[arg(long, default_value_t = 8000)]
    max_chars: usize,
}

fn main() -> Result<(), AppError> {
    logging::setup_logging();
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    let config = MetadataConfig { roots: args.roots, output: args.output, max_chars: args.max_chars };
    let count = build_metadata(&config)?;
    tracing::info!("Total exhibits processed: {}", count);
    tracing::info!("Output written to: {}", config.output.display());
    Ok(())
}
