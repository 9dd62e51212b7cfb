// src/metadata.rs
//! One JSON line per downloaded exhibit: where it lives and what it says.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::MetadataConfig;
use crate::extractors::exhibits::is_html;
use crate::extractors::text::extract_file_text;
use crate::storage::write_json_lines;
use crate::utils::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Name of the company directory the file sits in.
    pub ticker: String,
    pub source_folder: String,
    pub html_file: String,
    pub pdf_file: Option<String>,
    pub content: String,
}

/// Sorted entries of `dir` matching `keep`; an unreadable directory is
/// treated as empty.
fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(read) => read.filter_map(|e| e.ok()).map(|e| e.path()).filter(|p| keep(p)).collect(),
        Err(e) => {
            tracing::warn!("Could not list {}: {}", dir.display(), e);
            Vec::new()
        }
    };
    entries.sort();
    entries
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Records for `<root>/<label>/*.htm|*.html` across every configured root.
/// Missing roots are skipped.
pub fn collect_records(config: &MetadataConfig) -> Vec<MetadataRecord> {
    let mut records = Vec::new();

    for root in &config.roots {
        if !root.is_dir() {
            tracing::debug!("Skipping missing root {}", root.display());
            continue;
        }
        let source_folder = file_name(root);

        for company_dir in sorted_entries(root, |p| p.is_dir()) {
            let ticker = file_name(&company_dir);
            for html in sorted_entries(&company_dir, |p| p.is_file() && is_html(&file_name(p))) {
                let pdf = html.with_extension("pdf");
                records.push(MetadataRecord {
                    ticker: ticker.clone(),
                    source_folder: source_folder.clone(),
                    html_file: html.display().to_string(),
                    pdf_file: pdf.exists().then(|| pdf.display().to_string()),
                    content: extract_file_text(&html, config.max_chars),
                });
            }
        }
    }
    records
}

/// Rewrites the metadata file; returns how many records were written.
pub fn build_metadata(config: &MetadataConfig) -> Result<usize, StorageError> {
    let records = collect_records(config);
    write_json_lines(&config.output, &records)?;
    tracing::info!("Wrote {} metadata record(s) to {}", records.len(), config.output.display());
    Ok(records.len())
}

/// Reads a metadata file back. Blank lines are ignored.
pub fn read_metadata(path: &Path) -> Result<Vec<MetadataRecord>, StorageError> {
    let text = fs::read_to_string(path)?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(StorageError::from))
        .collect()
}
