// src/edgar/resolver.rs
//! Ticker / company name → CIK.
//!
//! Two lookup tables are involved: the SEC's `company_tickers.json`
//! ([`CompanyDirectory`]) and the much larger `cik-lookup-data.txt`
//! ([`BroadLookup`]) that also covers delisted and foreign filers. Both are
//! plain values; a [`Resolver`] owns them for as long as a run needs them.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::config::ResolverConfig;
use crate::edgar::client::{self, Fetcher};
use crate::edgar::models::Cik;
use crate::edgar::similarity;
use crate::utils::error::{EdgarError, ResolveError};

/// `casefold`, anything outside `[0-9a-z\s]` becomes a space, whitespace
/// collapsed. "AT&T Inc." → "at t inc".
pub fn normalize_name(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_digit() || c.is_ascii_lowercase() || c.is_whitespace() { c } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Name-matching tiers, tried in the order a caller lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameTier {
    Exact,
    Prefix,
    Substring,
    /// Prefix and substring accepted in one pass (broad table).
    PrefixOrSubstring,
    /// Similarity ratio at or above the configured threshold.
    Fuzzy,
}

impl NameTier {
    fn matches(self, candidate: &str, target: &str) -> bool {
        match self {
            NameTier::Exact => candidate == target,
            NameTier::Prefix => candidate.starts_with(target),
            NameTier::Substring => candidate.contains(target),
            NameTier::PrefixOrSubstring => candidate.starts_with(target) || candidate.contains(target),
            NameTier::Fuzzy => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameMatch {
    pub cik: Cik,
    pub tier: NameTier,
    /// Set for fuzzy matches.
    pub score: Option<f64>,
}

/// First candidate, in table order, matched by the earliest tier.
fn first_tier_hit<'a, I>(tiers: &[NameTier], candidates: I, target: &str) -> Option<NameMatch>
where
    I: Iterator<Item = (&'a str, &'a Cik)> + Clone,
{
    tiers.iter().find_map(|tier| {
        candidates
            .clone()
            .find(|(name, _)| tier.matches(name, target))
            .map(|(_, cik)| NameMatch { cik: cik.clone(), tier: *tier, score: None })
    })
}

#[derive(Debug, Deserialize)]
struct RawCompany {
    cik_str: u64,
    ticker: String,
    title: String,
}

#[derive(Debug, Clone)]
pub struct CompanyEntry {
    pub cik: Cik,
    pub ticker: String,
    pub title: String,
    normalized_title: String,
}

/// `company_tickers.json`, kept in file order.
#[derive(Debug, Default)]
pub struct CompanyDirectory {
    entries: Vec<CompanyEntry>,
    by_ticker: HashMap<String, usize>,
}

impl CompanyDirectory {
    const NAME_TIERS: [NameTier; 3] = [NameTier::Exact, NameTier::Prefix, NameTier::Substring];

    pub async fn load<F: Fetcher>(fetcher: &F) -> Result<Self, EdgarError> {
        let url = client::company_tickers_url();
        tracing::info!("Loading SEC ticker mapping from {}", url);
        let body = fetcher.get(&url).await?;
        let directory = Self::from_json(&body)?;
        tracing::info!("Loaded {} ticker mapping entries", directory.len());
        Ok(directory)
    }

    /// The file is an object keyed "0", "1", ...; entries are ordered by that
    /// numeric key so "first match wins" follows the file.
    pub fn from_json(bytes: &[u8]) -> Result<Self, EdgarError> {
        let raw: HashMap<String, RawCompany> =
            serde_json::from_slice(bytes).map_err(|e| EdgarError::Parse(format!("company_tickers.json: {}", e)))?;
        let mut keyed: Vec<(u64, RawCompany)> = raw
            .into_iter()
            .map(|(k, v)| (k.parse::<u64>().unwrap_or(u64::MAX), v))
            .collect();
        keyed.sort_by_key(|(k, _)| *k);

        let entries = keyed
            .into_iter()
            .map(|(_, raw)| CompanyEntry {
                cik: Cik::from_number(raw.cik_str),
                normalized_title: normalize_name(&raw.title),
                ticker: raw.ticker,
                title: raw.title,
            })
            .collect();
        Ok(Self::from_entries(entries))
    }

    fn from_entries(entries: Vec<CompanyEntry>) -> Self {
        let mut by_ticker = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_ticker.entry(entry.ticker.to_uppercase()).or_insert(idx);
        }
        Self { entries, by_ticker }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact, case-insensitive ticker match.
    pub fn cik_for_ticker(&self, ticker: &str) -> Option<&Cik> {
        self.by_ticker
            .get(&ticker.trim().to_uppercase())
            .map(|&idx| &self.entries[idx].cik)
    }

    /// Exact → prefix → substring on normalized titles.
    pub fn cik_for_name(&self, name: &str) -> Option<NameMatch> {
        let target = normalize_name(name);
        if target.is_empty() {
            return None;
        }
        let candidates = self.entries.iter().map(|e| (e.normalized_title.as_str(), &e.cik));
        first_tier_hit(&Self::NAME_TIERS, candidates, &target)
    }
}

#[derive(Debug, Clone)]
struct BroadRow {
    name: String,
    name_len: usize,
    cik: Cik,
}

/// `cik-lookup-data.txt`: one `NAME|CIK|` line per historical entity name.
#[derive(Debug, Default)]
pub struct BroadLookup {
    rows: Vec<BroadRow>,
}

impl BroadLookup {
    const NAME_TIERS: [NameTier; 2] = [NameTier::Exact, NameTier::PrefixOrSubstring];

    pub async fn load<F: Fetcher>(fetcher: &F) -> Result<Self, EdgarError> {
        let url = client::cik_lookup_url();
        tracing::info!("Loading broad CIK lookup from {}", url);
        let text = client::get_text(fetcher, &url).await?;
        let lookup = Self::parse(&text);
        tracing::info!("Loaded {} broad lookup rows", lookup.len());
        Ok(lookup)
    }

    /// Lines without a name or with a non-numeric CIK are dropped.
    pub fn parse(text: &str) -> Self {
        let rows = text
            .lines()
            .filter_map(|line| {
                let mut parts = line.trim().split('|');
                let name = parts.next()?.trim();
                let cik = Cik::parse(parts.next()?)?;
                if name.is_empty() {
                    return None;
                }
                let name = normalize_name(name);
                Some(BroadRow { name_len: name.chars().count(), name, cik })
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact → prefix-or-substring → best similarity ratio ≥ `threshold`.
    pub fn cik_for_name(&self, name: &str, threshold: f64) -> Option<NameMatch> {
        let target = normalize_name(name);
        if target.is_empty() {
            return None;
        }
        let candidates = self.rows.iter().map(|r| (r.name.as_str(), &r.cik));
        if let Some(hit) = first_tier_hit(&Self::NAME_TIERS, candidates, &target) {
            return Some(hit);
        }
        self.fuzzy(&target, threshold)
    }

    fn fuzzy(&self, target: &str, threshold: f64) -> Option<NameMatch> {
        let target_len = target.chars().count();
        let mut best: Option<(&Cik, f64)> = None;

        for row in &self.rows {
            // Rows that cannot reach the threshold can never be accepted.
            if similarity::ratio_upper_bound(target_len, row.name_len) < threshold {
                continue;
            }
            let score = similarity::ratio(target, &row.name);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((&row.cik, score));
            }
        }

        match best {
            Some((cik, score)) if score >= threshold => {
                tracing::debug!("Fuzzy match for {:?}: {} (ratio {:.3})", target, cik, score);
                Some(NameMatch { cik: cik.clone(), tier: NameTier::Fuzzy, score: Some(score) })
            }
            _ => None,
        }
    }
}

/// Tickers whose CIK changed at a known date (reorganizations). Filings
/// before the cutoff were made under the legacy CIK.
#[derive(Debug, Clone)]
pub struct LegacyOverrides {
    by_ticker: HashMap<String, Vec<(NaiveDate, Cik)>>,
}

impl Default for LegacyOverrides {
    fn default() -> Self {
        let mut overrides = Self { by_ticker: HashMap::new() };
        // Disney: new holding company CIK from 2019-03-21
        if let (Some(cutoff), Some(cik)) = (NaiveDate::from_ymd_opt(2019, 3, 21), Cik::parse("0001001039")) {
            overrides.insert("DIS", cutoff, cik);
        }
        overrides
    }
}

impl LegacyOverrides {
    pub fn empty() -> Self {
        Self { by_ticker: HashMap::new() }
    }

    pub fn insert(&mut self, ticker: &str, cutoff: NaiveDate, legacy: Cik) {
        self.by_ticker.entry(ticker.to_uppercase()).or_default().push((cutoff, legacy));
    }

    /// Legacy CIK of the first cutoff later than `as_of`, else `current`.
    pub fn apply(&self, ticker: &str, as_of: Option<NaiveDate>, current: Cik) -> Cik {
        let Some(as_of) = as_of else {
            return current;
        };
        self.by_ticker
            .get(&ticker.to_uppercase())
            .and_then(|cutoffs| cutoffs.iter().find(|(cutoff, _)| as_of < *cutoff))
            .map(|(_, legacy)| legacy.clone())
            .unwrap_or(current)
    }
}

/// Owns the lookup tables for one run.
pub struct Resolver {
    directory: CompanyDirectory,
    broad: Option<BroadLookup>,
    overrides: LegacyOverrides,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(directory: CompanyDirectory, overrides: LegacyOverrides, config: ResolverConfig) -> Self {
        Self { directory, broad: None, overrides, config }
    }

    /// Use an already-loaded broad table instead of fetching it on demand.
    pub fn with_broad_lookup(mut self, broad: BroadLookup) -> Self {
        self.broad = Some(broad);
        self
    }

    pub fn directory(&self) -> &CompanyDirectory {
        &self.directory
    }

    /// Ticker → CIK, with legacy overrides applied for `as_of`.
    pub fn resolve_ticker(&self, ticker: &str, as_of: Option<NaiveDate>) -> Result<Cik, ResolveError> {
        let cik = self
            .directory
            .cik_for_ticker(ticker)
            .cloned()
            .ok_or_else(|| ResolveError::TickerNotFound(ticker.to_string()))?;
        Ok(self.overrides.apply(ticker, as_of, cik))
    }

    /// Primary table first; the broad table is fetched the first time a
    /// name misses there and kept for the rest of this resolver's life.
    pub async fn resolve_name<F: Fetcher>(&mut self, fetcher: &F, name: &str) -> Result<NameMatch, ResolveError> {
        if let Some(hit) = self.directory.cik_for_name(name) {
            return Ok(hit);
        }
        if normalize_name(name).is_empty() {
            return Err(ResolveError::NameNotFound(name.to_string()));
        }
        if self.broad.is_none() {
            self.broad = Some(BroadLookup::load(fetcher).await?);
        }
        self.broad
            .as_ref()
            .and_then(|broad| broad.cik_for_name(name, self.config.fuzzy_threshold))
            .ok_or_else(|| ResolveError::NameNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::client::testing::FakeFetcher;

    const TICKERS: &str = r#"{
        "0": {"cik_str": 1744489, "ticker": "DIS", "title": "Walt Disney Co"},
        "1": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
        "2": {"cik_str": 14272, "ticker": "BMY", "title": "Bristol Myers Squibb Co"},
        "10": {"cik_str": 999001, "ticker": "APLX", "title": "Apple Hospitality Group"},
        "3": {"cik_str": 555000, "ticker": "BMYX", "title": "Bristol Holdings"}
    }"#;

    fn directory() -> CompanyDirectory {
        CompanyDirectory::from_json(TICKERS.as_bytes()).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize_name("  AT&T   Inc. "), "at t inc");
        assert_eq!(normalize_name("Bristol-Myers Squibb CO"), "bristol myers squibb co");
        assert_eq!(normalize_name("!!!"), "");
    }

    #[test]
    fn ticker_lookup_is_case_insensitive_and_padded() {
        let dir = directory();
        assert_eq!(dir.cik_for_ticker("aapl").unwrap().as_str(), "0000320193");
        assert_eq!(dir.cik_for_ticker(" BMY ").unwrap().as_str(), "0000014272");
        assert!(dir.cik_for_ticker("ZZZZ").is_none());
    }

    #[test]
    fn legacy_override_applies_only_before_cutoff() {
        let resolver = Resolver::new(directory(), LegacyOverrides::default(), ResolverConfig::default());
        assert_eq!(resolver.resolve_ticker("DIS", Some(date("2018-06-20"))).unwrap().as_str(), "0001001039");
        assert_eq!(resolver.resolve_ticker("dis", Some(date("2019-03-21"))).unwrap().as_str(), "0001744489");
        assert_eq!(resolver.resolve_ticker("DIS", None).unwrap().as_str(), "0001744489");
        assert!(matches!(
            resolver.resolve_ticker("NOPE", None),
            Err(ResolveError::TickerNotFound(_))
        ));
    }

    #[test]
    fn exact_name_match_wins_over_earlier_prefix_candidates() {
        // "Apple Inc." is entry 1; nothing earlier matches exactly
        let hit = directory().cik_for_name("APPLE, INC.").unwrap();
        assert_eq!(hit.tier, NameTier::Exact);
        assert_eq!(hit.cik.as_str(), "0000320193");

        // "bristol" prefixes both entry 2 and 3; file order picks entry 2
        let hit = directory().cik_for_name("Bristol").unwrap();
        assert_eq!(hit.tier, NameTier::Prefix);
        assert_eq!(hit.cik.as_str(), "0000014272");

        let hit = directory().cik_for_name("hospitality").unwrap();
        assert_eq!(hit.tier, NameTier::Substring);
        assert_eq!(hit.cik.as_str(), "0000999001");
    }

    #[test]
    fn entries_follow_numeric_key_order() {
        // key "10" must sort after "3", so "apple" prefix hits "Apple Inc." (key 1)
        let hit = directory().cik_for_name("apple").unwrap();
        assert_eq!(hit.cik.as_str(), "0000320193");
    }

    const BROAD: &str = "WALT DISNEY CO/|0001001039|\nACME WIDGETS LLC|0000000042|\nBROKEN ROW|abc|\n|0000000001|\nNORTHWIND TRADERS INC|77|\n";

    #[test]
    fn broad_lookup_skips_malformed_rows() {
        let broad = BroadLookup::parse(BROAD);
        assert_eq!(broad.len(), 3);
    }

    #[test]
    fn broad_lookup_fuzzy_threshold() {
        let broad = BroadLookup::parse(BROAD);
        // one transposed letter: ratio ≈ 0.95
        let hit = broad.cik_for_name("Northwind Tradres Inc", 0.90).unwrap();
        assert_eq!(hit.tier, NameTier::Fuzzy);
        assert_eq!(hit.cik.as_str(), "0000000077");
        assert!(hit.score.unwrap() >= 0.90);

        // same query under a stricter threshold finds nothing
        assert!(broad.cik_for_name("Northwind Tradres Inc", 0.99).is_none());
        assert!(broad.cik_for_name("Completely Unrelated Holdings", 0.90).is_none());
    }

    #[test]
    fn broad_lookup_exact_before_substring() {
        let broad = BroadLookup::parse("ACME WIDGETS LLC HOLDINGS|1|\nACME WIDGETS LLC|2|\n");
        let hit = broad.cik_for_name("acme widgets llc", 0.9).unwrap();
        assert_eq!(hit.tier, NameTier::Exact);
        assert_eq!(hit.cik.as_str(), "0000000002");
    }

    #[tokio::test]
    async fn resolve_name_fetches_broad_table_once() {
        let fake = FakeFetcher::new().route(client::cik_lookup_url(), BROAD);
        let mut resolver = Resolver::new(directory(), LegacyOverrides::empty(), ResolverConfig::default());

        // primary hit never touches the broad table
        let hit = resolver.resolve_name(&fake, "Walt Disney Co").await.unwrap();
        assert_eq!(hit.cik.as_str(), "0001744489");
        assert_eq!(fake.total_hits(), 0);

        let hit = resolver.resolve_name(&fake, "Acme Widgets").await.unwrap();
        assert_eq!(hit.tier, NameTier::PrefixOrSubstring);
        assert_eq!(hit.cik.as_str(), "0000000042");

        assert!(resolver.resolve_name(&fake, "Zebra Unlimited").await.is_err());
        assert_eq!(fake.hits(&client::cik_lookup_url()), 1);
    }
}
