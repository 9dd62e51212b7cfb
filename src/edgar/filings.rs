// src/edgar/filings.rs
use chrono::NaiveDate;

use crate::edgar::client::{self, Fetcher};
use crate::edgar::models::{Cik, CompanySubmission, Filing, FilingColumns};
use crate::utils::error::EdgarError;

/// What to enumerate for one issuer. Both date bounds are inclusive.
#[derive(Debug, Clone)]
pub struct FilingQuery {
    pub form: String,
    pub after: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
    pub include_amendments: bool,
    pub limit: Option<usize>,
}

impl FilingQuery {
    pub fn new(form: &str) -> Self {
        Self {
            form: form.trim().to_uppercase(),
            after: None,
            before: None,
            include_amendments: false,
            limit: None,
        }
    }

    pub fn between(mut self, after: Option<NaiveDate>, before: Option<NaiveDate>) -> Self {
        self.after = after;
        self.before = before;
        self
    }

    pub fn include_amendments(mut self, include: bool) -> Self {
        self.include_amendments = include;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.after.map_or(true, |after| date >= after) && self.before.map_or(true, |before| date <= before)
    }

    /// Base form (before any `/A`-style suffix) matches, and amendments only
    /// when asked for.
    fn accepts_form(&self, form: &str) -> bool {
        let upper = form.trim().to_uppercase();
        let base = upper.split('/').next().unwrap_or_default();
        if base != self.form {
            return false;
        }
        self.include_amendments || !upper.ends_with("/A")
    }

    /// Does a history file covering `[from, to]` intersect the window?
    fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.after.map_or(true, |after| to >= after) && self.before.map_or(true, |before| from <= before)
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn collect_block(columns: &FilingColumns, cik: &Cik, query: &FilingQuery, out: &mut Vec<Filing>) {
    for (form, accession, date) in columns.rows() {
        if !query.accepts_form(form) {
            continue;
        }
        let Some(filing_date) = parse_date(date) else {
            tracing::debug!("Skipping {} with unreadable filing date {:?}", accession, date);
            continue;
        };
        if !query.contains(filing_date) {
            continue;
        }
        out.push(Filing {
            form: form.to_string(),
            accession_number: accession.to_string(),
            filing_date,
            cik: cik.clone(),
        });
    }
}

/// History pages normally carry the columns at top level; a nested
/// `filings.recent` block is accepted too.
fn history_columns(value: serde_json::Value) -> Result<FilingColumns, serde_json::Error> {
    let block = match value.get("filings").and_then(|f| f.get("recent")) {
        Some(recent) => recent.clone(),
        None => value,
    };
    serde_json::from_value(block)
}

/// All filings of `query.form` for `cik` inside the window, oldest first.
///
/// Scans the inline `recent` block plus every paginated history file whose
/// declared range overlaps the window. History files that cannot be fetched
/// or parsed are skipped.
pub async fn gather_filings<F: Fetcher>(fetcher: &F, cik: &Cik, query: &FilingQuery) -> Result<Vec<Filing>, EdgarError> {
    let submission: CompanySubmission = client::get_json(fetcher, &client::submissions_url(cik)).await?;
    tracing::debug!("Submissions for {} ({}) loaded", cik, submission.name);

    let mut collected = Vec::new();
    collect_block(&submission.filings.recent, cik, query, &mut collected);

    for file in &submission.filings.files {
        let (Some(name), Some(from), Some(to)) = (
            file.name.as_deref(),
            file.filing_from.as_deref().and_then(parse_date),
            file.filing_to.as_deref().and_then(parse_date),
        ) else {
            continue;
        };
        if !query.overlaps(from, to) {
            tracing::trace!("History file {} ({}..{}) outside window", name, from, to);
            continue;
        }

        let url = client::submissions_page_url(name);
        let columns = match client::get_json::<_, serde_json::Value>(fetcher, &url).await {
            Ok(value) => history_columns(value).map_err(|e| EdgarError::Parse(e.to_string())),
            Err(e) => Err(e),
        };
        match columns {
            Ok(columns) => collect_block(&columns, cik, query, &mut collected),
            Err(e) => tracing::warn!("Skipping history file {}: {}", name, e),
        }
    }

    collected.sort_by_key(|f| f.filing_date);
    if let Some(limit) = query.limit.filter(|n| *n > 0) {
        collected.truncate(limit);
    }

    tracing::info!("{} {} filing(s) for CIK {} in window", collected.len(), query.form, cik);
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::client::testing::FakeFetcher;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn cik() -> Cik {
        Cik::parse("320193").unwrap()
    }

    const SUBMISSIONS: &str = r#"{
        "cik": "320193",
        "name": "Apple Inc.",
        "filings": {
            "recent": {
                "form": ["8-K", "8-K/A", "10-K", "8-K", "8-k", "8-K"],
                "accessionNumber": ["r1", "r2", "r3", "r4", "r5", "r6"],
                "filingDate": ["2020-03-05", "2020-03-06", "2020-03-07", "2021-01-01", "2020-02-28", "not-a-date"]
            },
            "files": [
                {"name": "CIK0000320193-submissions-001.json", "filingCount": 3, "filingFrom": "2010-01-01", "filingTo": "2019-12-31"},
                {"name": "CIK0000320193-submissions-002.json", "filingCount": 1, "filingFrom": "1994-01-01", "filingTo": "2009-12-31"},
                {"name": "CIK0000320193-submissions-003.json", "filingCount": 1, "filingFrom": "2019-06-01", "filingTo": "2019-12-31"}
            ]
        }
    }"#;

    const HISTORY_001: &str = r#"{
        "form": ["8-K", "8-K", "S-4"],
        "accessionNumber": ["h1", "h2", "h3"],
        "filingDate": ["2019-12-30", "2015-05-05", "2019-12-31"]
    }"#;

    fn fake() -> FakeFetcher {
        FakeFetcher::new()
            .route(client::submissions_url(&cik()), SUBMISSIONS)
            .route(client::submissions_page_url("CIK0000320193-submissions-001.json"), HISTORY_001)
            .failing(client::submissions_page_url("CIK0000320193-submissions-003.json"))
    }

    #[test]
    fn form_filter_strips_amendment_suffix() {
        let q = FilingQuery::new("8-k");
        assert!(q.accepts_form("8-K"));
        assert!(!q.accepts_form("8-K/A"));
        assert!(!q.accepts_form("8-K12B"));
        assert!(q.clone().include_amendments(true).accepts_form("8-K/A"));
    }

    #[tokio::test]
    async fn window_and_form_are_respected_across_recent_and_history() {
        let fake = fake();
        let query = FilingQuery::new("8-K").between(Some(date("2019-12-01")), Some(date("2020-03-31")));
        let filings = gather_filings(&fake, &cik(), &query).await.unwrap();

        let accessions: Vec<_> = filings.iter().map(|f| f.accession_number.as_str()).collect();
        assert_eq!(accessions, vec!["h1", "r5", "r1"]);
        for f in &filings {
            assert!(f.filing_date >= query.after.unwrap() && f.filing_date <= query.before.unwrap());
            assert_eq!(f.form.split('/').next().unwrap().to_uppercase(), "8-K");
            assert_eq!(f.cik, cik());
        }

        // 002 lies outside the window and is never fetched; 003 fails and is skipped
        assert_eq!(fake.hits(&client::submissions_page_url("CIK0000320193-submissions-002.json")), 0);
        assert_eq!(fake.hits(&client::submissions_page_url("CIK0000320193-submissions-003.json")), 1);
    }

    #[tokio::test]
    async fn amendments_and_limit() {
        let fake = fake();
        let query = FilingQuery::new("8-K")
            .between(Some(date("2020-01-01")), Some(date("2020-12-31")))
            .include_amendments(true)
            .limit(Some(2));
        let filings = gather_filings(&fake, &cik(), &query).await.unwrap();
        let accessions: Vec<_> = filings.iter().map(|f| f.accession_number.as_str()).collect();
        assert_eq!(accessions, vec!["r5", "r1"]);

        let query = query.limit(None);
        let filings = gather_filings(&fake, &cik(), &query).await.unwrap();
        assert!(filings.iter().any(|f| f.form == "8-K/A"));
    }

    #[tokio::test]
    async fn open_window_scans_every_history_file() {
        let fake = fake();
        let query = FilingQuery::new("8-K");
        let filings = gather_filings(&fake, &cik(), &query).await.unwrap();
        // 002 is unrouted (404) and skipped; dates stay ascending
        assert!(filings.windows(2).all(|w| w[0].filing_date <= w[1].filing_date));
        assert_eq!(filings.first().unwrap().accession_number, "h2");
        assert_eq!(filings.len(), 5);
    }

    #[test]
    fn nested_history_shape_is_accepted() {
        let value: serde_json::Value = serde_json::from_str(
            r#"{"filings":{"recent":{"form":["8-K"],"accessionNumber":["x"],"filingDate":["2001-01-01"]}}}"#,
        )
        .unwrap();
        let columns = history_columns(value).unwrap();
        assert_eq!(columns.rows().count(), 1);
    }
}
