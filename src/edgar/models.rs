// src/edgar/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Central Index Key, always stored zero-padded to 10 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cik(String);

impl Cik {
    pub const WIDTH: usize = 10;

    /// Accepts an all-digit string of at most 10 digits (surrounding
    /// whitespace ignored) and pads it.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = raw.trim();
        if digits.is_empty() || digits.len() > Self::WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(format!("{:0>width$}", digits, width = Self::WIDTH)))
    }

    pub fn from_number(n: u64) -> Self {
        Self(format!("{:010}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form used in archive paths (`/Archives/edgar/data/320193/...`).
    pub fn unpadded(&self) -> &str {
        let trimmed = self.0.trim_start_matches('0');
        if trimmed.is_empty() {
            "0"
        } else {
            trimmed
        }
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structure representing the EDGAR company submission index
/// Example: https://data.sec.gov/submissions/CIK0000320193.json
#[derive(Debug, Deserialize)]
pub struct CompanySubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub filings: Filings,
}

#[derive(Debug, Default, Deserialize)]
pub struct Filings {
    #[serde(default)]
    pub recent: FilingColumns,
    #[serde(default)]
    pub files: Vec<FilingFile>,
}

/// Reference to a paginated history file, e.g.
/// `CIK0000320193-submissions-001.json`, covering `[filingFrom, filingTo]`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingFile {
    pub name: Option<String>,
    #[serde(default)]
    pub filing_count: u32,
    pub filing_from: Option<String>,
    pub filing_to: Option<String>,
}

/// Column-oriented filing block: index `i` of each vector describes one filing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingColumns {
    #[serde(default)]
    pub accession_number: Vec<String>,
    #[serde(default)]
    pub filing_date: Vec<String>,
    #[serde(default)]
    pub form: Vec<String>,
}

impl FilingColumns {
    /// `(form, accession, date)` rows, truncated to the shortest column.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.form
            .iter()
            .zip(&self.accession_number)
            .zip(&self.filing_date)
            .map(|((form, acc), date)| (form.as_str(), acc.as_str(), date.as_str()))
    }
}

/// One filing that survived enumeration filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filing {
    pub form: String,
    pub accession_number: String,
    pub filing_date: NaiveDate,
    pub cik: Cik,
}

/// Exhibit bucket, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExhibitClass {
    /// Exhibit 2.1, the merger agreement itself.
    Primary,
    /// Exhibit 10.1, a general material contract.
    Fallback,
}

impl ExhibitClass {
    pub fn tag(&self) -> &'static str {
        match self {
            ExhibitClass::Primary => "EX-2.1",
            ExhibitClass::Fallback => "EX-10.1",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExhibitTarget {
    pub accession_number: String,
    pub filename: String,
    pub class: ExhibitClass,
}

impl ExhibitTarget {
    /// `<TAG>__<accession>__<filename>`; enough to trace the file back to EDGAR.
    pub fn saved_name(&self) -> String {
        format!("{}__{}__{}", self.class.tag(), self.accession_number, self.filename)
    }
}
