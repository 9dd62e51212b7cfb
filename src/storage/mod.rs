// src/storage/mod.rs
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::edgar::models::ExhibitTarget;
use crate::utils::error::StorageError;

pub const MISSING_LOG: &str = "missingexhibit2.1.txt";
pub const NOT_FOUND_LOG: &str = "tickersnotfound.txt";

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `<base>/<label>/`; path separators in labels are replaced.
    pub fn company_dir(&self, label: &str) -> PathBuf {
        let safe: String = label
            .trim()
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.base_dir.join(safe)
    }

    pub fn exhibit_path(&self, label: &str, target: &ExhibitTarget) -> PathBuf {
        self.company_dir(label).join(target.saved_name())
    }

    /// Writes a downloaded exhibit under its company directory. The bytes go
    /// to `<name>.tmp` first and are renamed into place, so the final path
    /// only ever holds a complete download.
    pub fn save_exhibit(&self, label: &str, target: &ExhibitTarget, content: &[u8]) -> Result<PathBuf, StorageError> {
        let target_dir = self.company_dir(label);
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }

        let name = target.saved_name();
        let file_path = target_dir.join(&name);
        let tmp_path = target_dir.join(format!("{}.tmp", name));
        fs::write(&tmp_path, content).map_err(StorageError::IoError)?;
        fs::rename(&tmp_path, &file_path).map_err(StorageError::IoError)?;

        tracing::info!("Saved exhibit to {} ({:.1} KB)", file_path.display(), content.len() as f64 / 1024.0);
        Ok(file_path)
    }

    /// Writes the run's two log files, replacing earlier ones.
    pub fn write_run_log(&self, log: &RunLog) -> Result<(PathBuf, PathBuf), StorageError> {
        let missing = self.base_dir.join(MISSING_LOG);
        let not_found = self.base_dir.join(NOT_FOUND_LOG);
        write_lines(&missing, &log.missing)?;
        write_lines(&not_found, &log.not_found)?;
        Ok((missing, not_found))
    }
}

/// Informational lines collected over one downloader run.
#[derive(Debug, Default, Clone)]
pub struct RunLog {
    /// Companies whose window produced no EX-2.1 (or no exhibit at all).
    pub missing: Vec<String>,
    /// Rows whose company could not be mapped to a CIK.
    pub not_found: Vec<String>,
}

fn write_lines(path: &Path, lines: &[String]) -> Result<(), StorageError> {
    let mut body = lines.join("\n");
    if !lines.is_empty() {
        body.push('\n');
    }
    fs::write(path, body)?;
    Ok(())
}

/// Writes one JSON document per line, truncating any previous file.
pub fn write_json_lines<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::models::ExhibitClass;

    fn target() -> ExhibitTarget {
        ExhibitTarget {
            accession_number: "0001193125-20-123456".into(),
            filename: "d1ex2-1.htm".into(),
            class: ExhibitClass::Primary,
        }
    }

    #[test]
    fn exhibit_lands_under_label_with_encoded_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("out")).unwrap();
        let path = storage.save_exhibit("DIS", &target(), b"<html/>").unwrap();
        assert_eq!(
            path,
            dir.path().join("out").join("DIS").join("EX-2.1__0001193125-20-123456__d1ex2-1.htm")
        );
        assert_eq!(path, storage.exhibit_path("DIS", &target()));
        assert_eq!(fs::read(&path).unwrap(), b"<html/>");
    }

    #[test]
    fn interrupted_write_never_occupies_the_final_path() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let final_path = storage.exhibit_path("DIS", &target());

        // A partial file left by an earlier crash sits beside the final name.
        let partial = final_path.with_file_name(format!("{}.tmp", target().saved_name()));
        fs::create_dir_all(partial.parent().unwrap()).unwrap();
        fs::write(&partial, b"<ht").unwrap();
        assert!(!final_path.exists());

        let path = storage.save_exhibit("DIS", &target(), b"<html>complete</html>").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"<html>complete</html>");
        assert!(!partial.exists());
    }

    #[test]
    fn labels_cannot_escape_the_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        assert_eq!(storage.company_dir("A/B Holdings").file_name().unwrap(), "A_B Holdings");
    }

    #[test]
    fn run_log_files_end_with_newline_only_when_non_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let log = RunLog {
            missing: vec!["Row 1 | DIS | a".into(), "Row 2 | X | b".into()],
            not_found: Vec::new(),
        };
        let (missing, not_found) = storage.write_run_log(&log).unwrap();
        assert_eq!(fs::read_to_string(missing).unwrap(), "Row 1 | DIS | a\nRow 2 | X | b\n");
        assert_eq!(fs::read_to_string(not_found).unwrap(), "");
    }

    #[test]
    fn json_lines_replace_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.jsonl");
        write_json_lines(&path, &[serde_json::json!({"a": 1}), serde_json::json!({"a": 2})]).unwrap();
        write_json_lines(&path, &[serde_json::json!({"a": 3})]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":3}\n");
    }
}
