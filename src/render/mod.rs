// src/render/mod.rs
//! HTML → PDF through whichever external renderer the host has.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::utils::error::RenderError;

const WKHTMLTOPDF_CANDIDATES: &[&str] = &[
    r"C:\Program Files\wkhtmltopdf\bin\wkhtmltopdf.exe",
    r"C:\Program Files (x86)\wkhtmltopdf\bin\wkhtmltopdf.exe",
    "wkhtmltopdf",
];

const BROWSER_CANDIDATES: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "chrome",
    "google-chrome",
    "chromium",
    "chromium-browser",
    "msedge",
    "edge",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfEngine {
    Wkhtmltopdf(PathBuf),
    /// Chrome, Chromium or Edge in headless print mode.
    HeadlessBrowser(PathBuf),
}

impl PdfEngine {
    fn label(&self) -> &'static str {
        match self {
            PdfEngine::Wkhtmltopdf(_) => "wkhtmltopdf",
            PdfEngine::HeadlessBrowser(_) => "headless",
        }
    }

    fn command(&self, html: &Path, pdf: &Path) -> Command {
        match self {
            PdfEngine::Wkhtmltopdf(exe) => {
                let mut cmd = Command::new(exe);
                cmd.args([
                    "--quiet",
                    "--enable-local-file-access",
                    "--load-error-handling",
                    "ignore",
                    "--load-media-error-handling",
                    "ignore",
                    "--page-size",
                    "Letter",
                ])
                .arg(html)
                .arg(pdf);
                cmd
            }
            PdfEngine::HeadlessBrowser(exe) => {
                let mut cmd = Command::new(exe);
                cmd.args([
                    "--headless",
                    "--disable-gpu",
                    "--no-sandbox",
                    "--disable-dev-shm-usage",
                    "--allow-file-access-from-files",
                    "--virtual-time-budget=15000",
                ])
                .arg(format!("--print-to-pdf={}", pdf.display()))
                .arg(file_url(html));
                cmd
            }
        }
    }

    async fn render(&self, html: &Path, pdf: &Path) -> Result<(), RenderError> {
        let output = self.command(html, pdf).output().await.map_err(|e| RenderError::Failed {
            engine: self.label(),
            message: e.to_string(),
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RenderError::Failed {
                engine: self.label(),
                message: if stderr.is_empty() {
                    format!("exited with {} without stderr", output.status)
                } else {
                    stderr
                },
            });
        }
        if !is_non_empty_file(pdf) {
            return Err(RenderError::Failed {
                engine: self.label(),
                message: "no PDF produced".to_string(),
            });
        }
        Ok(())
    }
}

fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

/// Absolute candidates are checked as-is; bare names are looked up on PATH.
fn find_executable(candidates: &[&str]) -> Option<PathBuf> {
    candidates.iter().find_map(|candidate| {
        let path = Path::new(candidate);
        if path.is_absolute() {
            path.is_file().then(|| path.to_path_buf())
        } else {
            which::which(candidate).ok()
        }
    })
}

/// `file://` URL of a local document; the plain path when it can't be made absolute.
fn file_url(path: &Path) -> String {
    std::path::absolute(path)
        .ok()
        .and_then(|abs| reqwest::Url::from_file_path(abs).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Sidecar that collects renderer errors: `X.htm` → `X.conversion_errors.txt`.
pub fn error_log_path(html: &Path) -> PathBuf {
    html.with_extension("conversion_errors.txt")
}

/// Engines in preference order.
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer {
    engines: Vec<PdfEngine>,
}

impl PdfRenderer {
    /// wkhtmltopdf first, then a Chromium-family browser.
    pub fn detect() -> Self {
        let mut engines = Vec::new();
        if let Some(exe) = find_executable(WKHTMLTOPDF_CANDIDATES) {
            engines.push(PdfEngine::Wkhtmltopdf(exe));
        }
        if let Some(exe) = find_executable(BROWSER_CANDIDATES) {
            engines.push(PdfEngine::HeadlessBrowser(exe));
        }
        tracing::info!("PDF engines available: {:?}", engines);
        Self { engines }
    }

    pub fn with_engines(engines: Vec<PdfEngine>) -> Self {
        Self { engines }
    }

    pub fn engines(&self) -> &[PdfEngine] {
        &self.engines
    }

    /// Renders with the first engine that succeeds. Every failure is
    /// written to the document's sidecar error file; the HTML is untouched.
    pub async fn convert(&self, html: &Path, pdf: &Path) -> bool {
        let mut errors = Vec::new();

        for engine in &self.engines {
            match engine.render(html, pdf).await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!("PDF conversion of {} failed: {}", html.display(), e);
                    errors.push(e.to_string());
                }
            }
        }
        if errors.is_empty() {
            errors.push(RenderError::NoEngine.to_string());
        }

        let log_path = error_log_path(html);
        let mut body = errors.join("\n");
        body.push('\n');
        if let Err(e) = std::fs::write(&log_path, body) {
            tracing::warn!("Could not write {}: {}", log_path.display(), e);
        }
        false
    }
}
