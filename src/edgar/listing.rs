// src/edgar/listing.rs
//! Document listings for one accession.
//!
//! EDGAR exposes an accession's file list in several shapes and none of them
//! is reliably present for old filings, so the locator walks an ordered list
//! of [`ListingStrategy`] values and keeps the first non-empty answer.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::edgar::client::{self, Fetcher};
use crate::edgar::models::Cik;
use crate::utils::error::EdgarError;

static FILENAME_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<FILENAME>\s*([^\r\n<>]+)").expect("Failed to compile FILENAME_TAG_RE"));

static DOCUMENT_HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href="([^"]+\.(?:htm|html|txt|xml|xsd|zip|jpg|png|gif|xlsx))""#)
        .expect("Failed to compile DOCUMENT_HREF_RE")
});

/// One way of listing an accession's documents: where to look and how to
/// read what comes back.
pub trait ListingStrategy {
    fn name(&self) -> &'static str;
    fn url(&self, cik: &Cik, accession: &str) -> String;
    fn parse(&self, body: &[u8]) -> Result<Vec<String>, EdgarError>;
}

/// `index.json`, the structured directory listing.
pub struct IndexJson;

#[derive(Deserialize)]
struct DirectoryListing {
    #[serde(default)]
    directory: DirectoryItems,
}

#[derive(Deserialize, Default)]
struct DirectoryItems {
    #[serde(default)]
    item: Vec<DirectoryItem>,
}

#[derive(Deserialize)]
struct DirectoryItem {
    name: Option<String>,
}

impl ListingStrategy for IndexJson {
    fn name(&self) -> &'static str {
        "index.json"
    }

    fn url(&self, cik: &Cik, accession: &str) -> String {
        format!("{}/index.json", client::archive_base(cik, accession))
    }

    fn parse(&self, body: &[u8]) -> Result<Vec<String>, EdgarError> {
        let listing: DirectoryListing =
            serde_json::from_slice(body).map_err(|e| EdgarError::Parse(format!("index.json: {}", e)))?;
        Ok(listing
            .directory
            .item
            .into_iter()
            .filter_map(|item| item.name)
            .filter(|name| !name.is_empty())
            .collect())
    }
}

/// The legacy full submission text, scanned for `<FILENAME>` tags.
pub struct FullSubmission;

impl ListingStrategy for FullSubmission {
    fn name(&self) -> &'static str {
        "full submission text"
    }

    fn url(&self, cik: &Cik, accession: &str) -> String {
        format!("{}/{}.txt", client::archive_base(cik, accession), accession)
    }

    fn parse(&self, body: &[u8]) -> Result<Vec<String>, EdgarError> {
        let text = String::from_utf8_lossy(body);
        Ok(FILENAME_TAG_RE
            .captures_iter(&text)
            .map(|c| c[1].trim().to_string())
            .filter(|name| !name.is_empty())
            .collect())
    }
}

/// `<accession>-index.html`, scraped for links to documents.
pub struct IndexHtml;

impl ListingStrategy for IndexHtml {
    fn name(&self) -> &'static str {
        "index.html"
    }

    fn url(&self, cik: &Cik, accession: &str) -> String {
        format!("{}/{}-index.html", client::archive_base(cik, accession), accession)
    }

    fn parse(&self, body: &[u8]) -> Result<Vec<String>, EdgarError> {
        let html = String::from_utf8_lossy(body);
        Ok(DOCUMENT_HREF_RE
            .captures_iter(&html)
            .filter_map(|c| c[1].rsplit('/').next().map(str::to_string))
            .filter(|name| !name.is_empty())
            .collect())
    }
}

/// Strategy order used for every accession.
pub fn default_strategies() -> Vec<Box<dyn ListingStrategy>> {
    vec![Box::new(IndexJson), Box::new(FullSubmission), Box::new(IndexHtml)]
}

fn dedup_preserving_order(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names.into_iter().filter(|n| seen.insert(n.clone())).collect()
}

/// Filenames in an accession, from the first strategy that yields any.
/// Fetch or parse failures count as "nothing here" and fall through.
pub async fn list_documents<F: Fetcher>(
    fetcher: &F,
    cik: &Cik,
    accession: &str,
    strategies: &[Box<dyn ListingStrategy>],
) -> Vec<String> {
    for strategy in strategies {
        let url = strategy.url(cik, accession);
        let names = match fetcher.get(&url).await {
            Ok(body) => strategy.parse(&body),
            Err(e) => Err(e),
        };
        match names {
            Ok(names) if !names.is_empty() => {
                tracing::debug!("{}: {} document(s) via {}", accession, names.len(), strategy.name());
                return dedup_preserving_order(names);
            }
            Ok(_) => tracing::debug!("{}: {} listed nothing", accession, strategy.name()),
            Err(e) => tracing::debug!("{}: {} failed: {}", accession, strategy.name(), e),
        }
    }
    tracing::warn!("{}: no listing strategy produced any documents", accession);
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::client::testing::FakeFetcher;

    const ACC: &str = "0001193125-20-123456";

    fn cik() -> Cik {
        Cik::parse("1001039").unwrap()
    }

    #[test]
    fn strategy_urls() {
        let base = "https://www.sec.gov/Archives/edgar/data/1001039/000119312520123456";
        assert_eq!(IndexJson.url(&cik(), ACC), format!("{base}/index.json"));
        assert_eq!(FullSubmission.url(&cik(), ACC), format!("{base}/{ACC}.txt"));
        assert_eq!(IndexHtml.url(&cik(), ACC), format!("{base}/{ACC}-index.html"));
    }

    #[test]
    fn parses_each_listing_shape() {
        let json = br#"{"directory":{"item":[{"name":"d1.htm"},{"name":""},{"type":"dir"},{"name":"ex21.htm"}]}}"#;
        assert_eq!(IndexJson.parse(json).unwrap(), vec!["d1.htm", "ex21.htm"]);
        assert!(IndexJson.parse(b"<html>").is_err());

        let txt = b"<DOCUMENT>\n<TYPE>EX-2.1\n<filename>d123ex21.htm\r\n<TEXT>\n<FILENAME> main.htm \n";
        assert_eq!(FullSubmission.parse(txt).unwrap(), vec!["d123ex21.htm", "main.htm"]);

        let html = br#"<a href="/Archives/edgar/data/1/2/d1ex2-1.htm">x</a><a href="style.css">y</a><a HREF="R1.XML">z</a>"#;
        assert_eq!(IndexHtml.parse(html).unwrap(), vec!["d1ex2-1.htm", "R1.XML"]);
    }

    #[tokio::test]
    async fn falls_through_failed_and_empty_strategies() {
        let strategies = default_strategies();
        let fake = FakeFetcher::new()
            .failing(IndexJson.url(&cik(), ACC))
            .route(FullSubmission.url(&cik(), ACC), "no tags in here")
            .route(
                IndexHtml.url(&cik(), ACC),
                r#"<a href="/x/d1ex2-1.htm">a</a><a href="/y/d1ex2-1.htm">b</a><a href="d1.htm">c</a>"#,
            );

        let names = list_documents(&fake, &cik(), ACC, &strategies).await;
        assert_eq!(names, vec!["d1ex2-1.htm", "d1.htm"]);
        assert_eq!(fake.total_hits(), 3);
    }

    #[tokio::test]
    async fn stops_at_first_non_empty_strategy() {
        let strategies = default_strategies();
        let fake = FakeFetcher::new().route(
            IndexJson.url(&cik(), ACC),
            r#"{"directory":{"item":[{"name":"a.htm"}]}}"#,
        );
        let names = list_documents(&fake, &cik(), ACC, &strategies).await;
        assert_eq!(names, vec!["a.htm"]);
        assert_eq!(fake.total_hits(), 1);
    }

    #[tokio::test]
    async fn nothing_anywhere_is_empty_not_error() {
        let strategies = default_strategies();
        let fake = FakeFetcher::new();
        assert!(list_documents(&fake, &cik(), ACC, &strategies).await.is_empty());
    }
}
