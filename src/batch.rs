// src/batch.rs
//! Deal-sheet batch mode: one spreadsheet row per deal, one fetch per party.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::edgar::client::Fetcher;
use crate::edgar::filings::FilingQuery;
use crate::edgar::resolver::Resolver;
use crate::pipeline::{identify, CompanyJob, CompanyRef, Downloader};
use crate::storage::RunLog;
use crate::utils::error::AppError;

static SLASH_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2})/(\d{1,2})/(\d{2,4})\s*$").expect("Failed to compile SLASH_DATE_RE"));

static TICKER_JUNK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Z0-9.\-]").expect("Failed to compile TICKER_JUNK_RE"));

/// Which side of each deal to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Filer {
    Acquirer,
    Target,
    Both,
}

impl Filer {
    fn roles(self) -> &'static [Role] {
        match self {
            Filer::Acquirer => &[Role::Acquirer],
            Filer::Target => &[Role::Target],
            Filer::Both => &[Role::Acquirer, Role::Target],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Acquirer,
    Target,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Acquirer => "acquirer",
            Role::Target => "target",
        }
    }
}

/// The cells describing one party of a deal, blanks already dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyCells {
    pub cik: Option<String>,
    pub ticker: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealRow {
    /// 1-based data row number.
    pub row: usize,
    pub announce: Option<String>,
    pub acquirer: PartyCells,
    pub target: PartyCells,
}

impl DealRow {
    /// Identity candidates for `role`: own CIK, own ticker, counter-party
    /// ticker, own name, counter-party name.
    pub fn company_ref(&self, role: Role) -> CompanyRef {
        let (own, other) = match role {
            Role::Acquirer => (&self.acquirer, &self.target),
            Role::Target => (&self.target, &self.acquirer),
        };
        CompanyRef {
            cik: own.cik.clone(),
            tickers: own.ticker.iter().chain(other.ticker.iter()).cloned().collect(),
            names: own.name.iter().chain(other.name.iter()).cloned().collect(),
        }
    }
}

struct Columns {
    announce: usize,
    acquirer: PartyColumns,
    target: PartyColumns,
}

#[derive(Default)]
struct PartyColumns {
    cik: Option<usize>,
    ticker: Option<usize>,
    name: Option<usize>,
}

impl PartyColumns {
    fn has_identifier(&self) -> bool {
        self.cik.is_some() || self.ticker.is_some()
    }

    fn read(&self, record: &[String]) -> PartyCells {
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).and_then(|c| non_blank(c));
        PartyCells {
            cik: cell(self.cik),
            ticker: self.ticker.and_then(|i| record.get(i)).and_then(|c| normalize_ticker(c)),
            name: cell(self.name),
        }
    }
}

fn non_blank(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl Columns {
    /// Header matching is case-insensitive; the sheet must have an
    /// announce-date column and at least one ticker or CIK column.
    fn locate(header: &[String]) -> Result<Self, AppError> {
        let headers: HashMap<String, usize> =
            header.iter().enumerate().map(|(i, h)| (h.trim().to_lowercase(), i)).collect();
        let col = |names: &[&str]| names.iter().find_map(|n| headers.get(&n.to_lowercase()).copied());

        let acquirer = PartyColumns {
            cik: col(&["Acquirer CIK", "Acquirer_CIK"]),
            ticker: col(&["Acquirer Ticker", "Acquirer_Ticker"]),
            name: col(&["Acquirer Name"]),
        };
        let target = PartyColumns {
            cik: col(&["Target CIK", "Target_CIK"]),
            ticker: col(&["Target Ticker", "Target_Ticker"]),
            name: col(&["Target Name"]),
        };
        match col(&["Announce Date", "Announcement Date"]) {
            Some(announce) if acquirer.has_identifier() || target.has_identifier() => {
                Ok(Columns { announce, acquirer, target })
            }
            _ => Err(AppError::Config(
                "Deal sheet must contain Announce Date and a ticker/CIK column (Acquirer or Target)".to_string(),
            )),
        }
    }

    fn deal(&self, row: usize, record: &[String]) -> DealRow {
        DealRow {
            row,
            announce: record.get(self.announce).and_then(|c| non_blank(c)),
            acquirer: self.acquirer.read(record),
            target: self.target.read(record),
        }
    }
}

/// Loads a deal sheet, choosing the reader by extension: `.xlsx`, `.xlsm`
/// and `.xls` go through the workbook reader, anything else is read as CSV.
pub fn load_deals(path: &Path) -> Result<Vec<DealRow>, AppError> {
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
    match ext.as_deref() {
        Some("xlsx" | "xlsm" | "xls") => read_deals_workbook(path),
        _ => read_deals(File::open(path)?),
    }
}

/// Parses a CSV deal sheet.
pub fn read_deals<R: Read>(reader: R) -> Result<Vec<DealRow>, AppError> {
    let mut sheet = csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(reader);

    let header: Vec<String> = sheet.headers()?.iter().map(str::to_string).collect();
    let columns = Columns::locate(&header)?;

    let mut rows = Vec::new();
    for (i, record) in sheet.records().enumerate() {
        let record: Vec<String> = record?.iter().map(str::to_string).collect();
        rows.push(columns.deal(i + 1, &record));
    }
    Ok(rows)
}

/// Parses the first worksheet of a spreadsheet. Date cells become
/// `YYYY-MM-DD`; numeric cells print without a trailing `.0`.
pub fn read_deals_workbook(path: &Path) -> Result<Vec<DealRow>, AppError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Config(format!("{} has no worksheets", path.display())))??;

    let mut lines = range.rows().map(|row| row.iter().map(sheet_cell).collect::<Vec<String>>());
    let header = lines.next().unwrap_or_default();
    let columns = Columns::locate(&header)?;

    Ok(lines
        .enumerate()
        .filter(|(_, record)| record.iter().any(|c| !c.trim().is_empty()))
        .map(|(i, record)| columns.deal(i + 1, &record))
        .collect())
}

fn sheet_cell(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => {
            cell.as_date().map(|d| d.to_string()).unwrap_or_else(|| cell.to_string())
        }
        other => other.to_string(),
    }
}

/// `"bmy us"` → `BMY`; blanks and spreadsheet null spellings → `None`.
pub fn normalize_ticker(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || ["nan", "none", "null"].contains(&trimmed.to_lowercase().as_str()) {
        return None;
    }
    let first = trimmed.to_uppercase().split_whitespace().next()?.to_string();
    let cleaned = TICKER_JUNK_RE.replace_all(&first, "").replace(".US", "");
    (!cleaned.is_empty()).then_some(cleaned)
}

/// `YYYY-MM-DD` (a trailing time is ignored) or `M/D/YY[YY]`.
pub fn parse_deal_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Some(caps) = SLASH_DATE_RE.captures(raw) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let mut year: i32 = caps[3].parse().ok()?;
        if year < 100 {
            year += if year < 70 { 2000 } else { 1900 };
        }
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Inclusive `anchor ± days`; `None` when either end leaves the calendar.
pub fn window_from_anchor(anchor: NaiveDate, days: i64) -> Option<(NaiveDate, NaiveDate)> {
    let span = Duration::try_days(days)?;
    Some((anchor.checked_sub_signed(span)?, anchor.checked_add_signed(span)?))
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub filer: Filer,
    pub window_days: i64,
    pub form: String,
    pub include_amendments: bool,
    pub limit: Option<usize>,
}

/// Runs every row; unresolvable parties and gaps end up in the returned log.
pub async fn run_batch<F: Fetcher>(
    rows: &[DealRow],
    options: &BatchOptions,
    resolver: &mut Resolver,
    fetcher: &F,
    downloader: &Downloader<'_, F>,
) -> RunLog {
    let mut log = RunLog::default();

    for deal in rows {
        let Some(anchor) = deal.announce.as_deref().and_then(parse_deal_date) else {
            log.missing.push(format!("Row {} | invalid Announce Date", deal.row));
            continue;
        };
        let Some((after, before)) = window_from_anchor(anchor, options.window_days) else {
            log.missing.push(format!("Row {} | window of {} days is out of range", deal.row, options.window_days));
            continue;
        };

        for role in options.filer.roles() {
            let company = deal.company_ref(*role);
            let (cik, label) = match identify(resolver, fetcher, &company, Some(anchor)).await {
                Ok(found) => found,
                Err(tried) => {
                    let tried = if tried.is_empty() { "n/a".to_string() } else { tried.join(", ") };
                    log.not_found.push(format!(
                        "Row {} [{}] | NO ID | after={} before={} | tried: {}",
                        deal.row,
                        role.as_str(),
                        after,
                        before,
                        tried
                    ));
                    continue;
                }
            };

            tracing::info!("Row {} [{}] {} (CIK {}) {}..{}", deal.row, role.as_str(), label, cik, after, before);
            let job = CompanyJob {
                row: deal.row,
                label,
                cik,
                query: FilingQuery::new(&options.form)
                    .between(Some(after), Some(before))
                    .include_amendments(options.include_amendments)
                    .limit(options.limit),
            };
            downloader.download_company(&job, &mut log).await;
        }
    }
    log
}
