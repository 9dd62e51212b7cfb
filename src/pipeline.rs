// src/pipeline.rs
//! Per-company fetch: enumerate filings, locate exhibits, download the
//! preferred tier, convert to PDF.

use chrono::NaiveDate;

use crate::edgar::client::{self, Fetcher};
use crate::edgar::filings::{gather_filings, FilingQuery};
use crate::edgar::listing::{self, ListingStrategy};
use crate::edgar::models::{Cik, ExhibitClass, ExhibitTarget};
use crate::edgar::resolver::Resolver;
use crate::extractors::exhibits::{self, ExhibitTier};
use crate::render::PdfRenderer;
use crate::storage::{RunLog, StorageManager};

/// How a company was named in the input. Tickers and names are tried in
/// order after an explicit CIK.
#[derive(Debug, Clone, Default)]
pub struct CompanyRef {
    pub cik: Option<String>,
    pub tickers: Vec<String>,
    pub names: Vec<String>,
}

/// Resolves a company to `(cik, label)`. On failure returns what was tried.
///
/// The label names the output directory: the first available ticker, else
/// the first name, else the CIK itself.
pub async fn identify<F: Fetcher>(
    resolver: &mut Resolver,
    fetcher: &F,
    company: &CompanyRef,
    as_of: Option<NaiveDate>,
) -> Result<(Cik, String), Vec<String>> {
    let fallback_label = || {
        company
            .tickers
            .first()
            .or_else(|| company.names.first())
            .cloned()
    };

    if let Some(cik) = company.cik.as_deref().and_then(Cik::parse) {
        let label = fallback_label().unwrap_or_else(|| cik.to_string());
        return Ok((cik, label));
    }

    let mut tried = Vec::new();
    for ticker in &company.tickers {
        match resolver.resolve_ticker(ticker, as_of) {
            Ok(cik) => return Ok((cik, ticker.clone())),
            Err(e) => tried.push(format!("ticker={} ({})", ticker, e)),
        }
    }
    for name in &company.names {
        match resolver.resolve_name(fetcher, name).await {
            Ok(hit) => {
                tracing::info!("Resolved name {:?} to CIK {} via {:?} match", name, hit.cik, hit.tier);
                let label = fallback_label().unwrap_or_else(|| name.clone());
                return Ok((hit.cik, label));
            }
            Err(e) => tried.push(format!("name={} ({})", name, e)),
        }
    }
    Err(tried)
}

/// One company and window to fetch.
#[derive(Debug, Clone)]
pub struct CompanyJob {
    /// Deal sheet row, 0 in single-company mode.
    pub row: usize,
    pub label: String,
    pub cik: Cik,
    pub query: FilingQuery,
}

impl CompanyJob {
    fn window(&self) -> String {
        let fmt = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
        format!("{}..{}", fmt(self.query.after), fmt(self.query.before))
    }

    fn missing_line(&self, note: &str) -> String {
        format!("Row {} | {} | CIK={} | Window={} | {}", self.row, self.label, self.cik, self.window(), note)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSelection {
    pub targets: Vec<ExhibitTarget>,
    pub used_primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyOutcome {
    /// Targets present on disk after the run (new or pre-existing).
    pub saved: usize,
    /// Targets actually fetched this run.
    pub downloaded: usize,
    pub converted: usize,
}

pub struct Downloader<'a, F> {
    fetcher: &'a F,
    storage: &'a StorageManager,
    renderer: Option<&'a PdfRenderer>,
    strategies: Vec<Box<dyn ListingStrategy>>,
    tiers: Vec<ExhibitTier>,
}

impl<'a, F: Fetcher> Downloader<'a, F> {
    pub fn new(fetcher: &'a F, storage: &'a StorageManager) -> Self {
        Self {
            fetcher,
            storage,
            renderer: None,
            strategies: listing::default_strategies(),
            tiers: exhibits::default_tiers(),
        }
    }

    pub fn with_renderer(mut self, renderer: Option<&'a PdfRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Exhibits of the preferred tier across every filing in the window.
    pub async fn find_targets(&self, cik: &Cik, query: &FilingQuery) -> TargetSelection {
        let filings = match gather_filings(self.fetcher, cik, query).await {
            Ok(filings) => filings,
            Err(e) => {
                tracing::warn!("Could not enumerate filings for CIK {}: {}", cik, e);
                return TargetSelection::default();
            }
        };

        let mut found = Vec::new();
        for filing in &filings {
            let names = listing::list_documents(self.fetcher, cik, &filing.accession_number, &self.strategies).await;
            found.extend(exhibits::classify_listing(&filing.accession_number, &names, &self.tiers));
        }

        let targets = exhibits::select_preferred(found, &self.tiers);
        let used_primary = targets.first().map_or(false, |t| t.class == ExhibitClass::Primary);
        TargetSelection { targets, used_primary }
    }

    /// Downloads (and converts) one company's exhibits; notes gaps in `log`.
    pub async fn download_company(&self, job: &CompanyJob, log: &mut RunLog) -> CompanyOutcome {
        let selection = self.find_targets(&job.cik, &job.query).await;
        let mut outcome = CompanyOutcome::default();

        if selection.targets.is_empty() {
            tracing::info!("{}: no exhibit found in {}", job.label, job.window());
            log.missing.push(job.missing_line("no Exhibit 2.1 found"));
            return outcome;
        }

        for target in &selection.targets {
            let path = self.storage.exhibit_path(&job.label, target);
            if path.exists() {
                tracing::debug!("Already have {}", path.display());
            } else {
                let url = client::document_url(&job.cik, &target.accession_number, &target.filename);
                let saved = match self.fetcher.get(&url).await {
                    Ok(body) => self.storage.save_exhibit(&job.label, target, &body).map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                if let Err(e) = saved {
                    tracing::warn!("{}: failed {}: {}", job.label, target.saved_name(), e);
                    continue;
                }
                outcome.downloaded += 1;
            }
            outcome.saved += 1;

            if let Some(renderer) = self.renderer {
                let pdf = path.with_extension("pdf");
                if !pdf.exists() {
                    if renderer.convert(&path, &pdf).await {
                        tracing::info!("{}: PDF {}", job.label, pdf.display());
                        outcome.converted += 1;
                    } else {
                        tracing::warn!("{}: PDF conversion failed for {}", job.label, target.saved_name());
                    }
                }
            }
        }

        if !selection.used_primary {
            log.missing.push(job.missing_line("no EX-2.1; used EX-10.1 fallback"));
        }

        tracing::info!(
            "{}: {} exhibit(s) on disk, {} downloaded this run",
            job.label,
            outcome.saved,
            outcome.downloaded
        );
        outcome
    }
}
