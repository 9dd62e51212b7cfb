// src/edgar/client.rs
use crate::config::FetchConfig;
use crate::edgar::models::Cik;
use crate::utils::error::EdgarError;
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;

pub const SEC_BASE: &str = "https://www.sec.gov";
pub const DATA_BASE: &str = "https://data.sec.gov";

/// Anything that can GET a URL and hand back the body.
///
/// `EdgarClient` is the real implementation; tests substitute an in-memory
/// map so resolver, enumeration, and download logic run without a network.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn get(&self, url: &str) -> Result<Vec<u8>, EdgarError>;
}

/// reqwest client configured for EDGAR interaction.
pub struct EdgarClient {
    client: reqwest::Client,
    config: FetchConfig,
}

impl EdgarClient {
    pub fn new(config: FetchConfig) -> Result<Self, EdgarError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str()) // Set the required User-Agent
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn is_transient(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

impl Fetcher for EdgarClient {
    /// GET with retry. 429/5xx and transport failures back off linearly and
    /// retry; other error statuses fail at once.
    async fn get(&self, url: &str) -> Result<Vec<u8>, EdgarError> {
        let attempts = self.config.retries.max(1);
        let mut last = String::new();

        for attempt in 1..=attempts {
            tracing::debug!("GET {} (attempt {}/{})", url, attempt, attempts);
            let response = self
                .client
                .get(url)
                .header(header::ACCEPT, "application/json,application/xml,text/html,text/plain,*/*")
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.bytes().await {
                            Ok(body) => {
                                tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
                                // Courtesy delay; SEC asks for at most 10 requests/second.
                                tokio::time::sleep(self.config.sleep).await;
                                return Ok(body.to_vec());
                            }
                            Err(e) => last = e.to_string(),
                        }
                    } else if Self::is_transient(status) {
                        last = format!("status={}", status);
                    } else if status == StatusCode::FORBIDDEN {
                        tracing::warn!("Received 403 Forbidden for {} - check User-Agent and rate limits.", url);
                        return Err(EdgarError::RateLimited);
                    } else if status == StatusCode::NOT_FOUND {
                        return Err(EdgarError::NotFound(url.to_string()));
                    } else {
                        return Err(EdgarError::Http { status, url: url.to_string() });
                    }
                }
                Err(e) => last = e.to_string(),
            }

            tracing::warn!("GET {} attempt {} failed: {}", url, attempt, last);
            tokio::time::sleep(self.config.backoff(attempt)).await;
        }

        Err(EdgarError::RetriesExhausted { url: url.to_string(), attempts, last })
    }
}

pub async fn get_json<F: Fetcher, T: DeserializeOwned>(fetcher: &F, url: &str) -> Result<T, EdgarError> {
    let body = fetcher.get(url).await?;
    serde_json::from_slice(&body).map_err(|e| EdgarError::Parse(format!("{}: {}", url, e)))
}

/// Body as text; invalid UTF-8 is replaced rather than rejected.
pub async fn get_text<F: Fetcher>(fetcher: &F, url: &str) -> Result<String, EdgarError> {
    let body = fetcher.get(url).await?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

// --- Endpoint builders ---

pub fn company_tickers_url() -> String {
    format!("{}/files/company_tickers.json", SEC_BASE)
}

pub fn cik_lookup_url() -> String {
    format!("{}/Archives/edgar/cik-lookup-data.txt", SEC_BASE)
}

pub fn submissions_url(cik: &Cik) -> String {
    format!("{}/submissions/CIK{}.json", DATA_BASE, cik)
}

/// Paginated history file named in `filings.files[].name`.
pub fn submissions_page_url(name: &str) -> String {
    format!("{}/submissions/{}", DATA_BASE, name)
}

/// Archive folder of one accession: unpadded CIK, accession without dashes.
pub fn archive_base(cik: &Cik, accession: &str) -> String {
    format!(
        "{}/Archives/edgar/data/{}/{}",
        SEC_BASE,
        cik.unpadded(),
        accession.replace('-', "")
    )
}

pub fn document_url(cik: &Cik, accession: &str, filename: &str) -> String {
    format!("{}/{}", archive_base(cik, accession), filename)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Fetcher;
    use crate::utils::error::EdgarError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory EDGAR: URL → body, with per-URL hit counts.
    #[derive(Default)]
    pub struct FakeFetcher {
        routes: HashMap<String, Vec<u8>>,
        failing: Vec<String>,
        hits: RefCell<HashMap<String, usize>>,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
            self.routes.insert(url.into(), body.into());
            self
        }

        /// URL that fails as if retries were exhausted.
        pub fn failing(mut self, url: impl Into<String>) -> Self {
            self.failing.push(url.into());
            self
        }

        pub fn hits(&self, url: &str) -> usize {
            self.hits.borrow().get(url).copied().unwrap_or(0)
        }

        pub fn total_hits(&self) -> usize {
            self.hits.borrow().values().sum()
        }
    }

    impl Fetcher for FakeFetcher {
        async fn get(&self, url: &str) -> Result<Vec<u8>, EdgarError> {
            *self.hits.borrow_mut().entry(url.to_string()).or_insert(0) += 1;
            if self.failing.iter().any(|u| u == url) {
                return Err(EdgarError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: 3,
                    last: "status=503 Service Unavailable".to_string(),
                });
            }
            self.routes
                .get(url)
                .cloned()
                .ok_or_else(|| EdgarError::NotFound(url.to_string()))
        }
    }
}
