// src/rag/embedder.rs
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::utils::error::RagError;

/// Turns text into vectors. One vector per input, in input order.
#[allow(async_fn_in_trait)]
pub trait Embedder {
    fn model(&self) -> &str;
    fn batch_size(&self) -> usize;
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Client for any OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    config: EmbeddingConfig,
}

impl OpenAiEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self, RagError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            let auth = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| RagError::Format("embedding API key is not a valid header value".to_string()))?;
            headers.insert(AUTHORIZATION, auth);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;
        let endpoint = format!("{}/embeddings", config.base_url.trim_end_matches('/'));
        Ok(Self { client, endpoint, config })
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn retry_backoff(attempt: u32) -> Duration {
        Duration::from_millis(500 * (1 << attempt.min(5)))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl Embedder for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size.max(1)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest { model: &self.config.model, input: inputs };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let can_retry = attempt < self.config.max_retries;
            let resp = match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(resp) => resp,
                Err(e) if can_retry && (e.is_timeout() || e.is_connect()) => {
                    tracing::warn!("Embedding request failed (attempt {}): {}", attempt, e);
                    tokio::time::sleep(Self::retry_backoff(attempt)).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = resp.status();
            if status.is_success() {
                let mut parsed: EmbeddingResponse = resp.json().await?;
                parsed.data.sort_by_key(|d| d.index);
                if parsed.data.len() != inputs.len() {
                    return Err(RagError::Format(format!(
                        "{} embeddings returned for {} inputs",
                        parsed.data.len(),
                        inputs.len()
                    )));
                }
                return Ok(parsed.data.into_iter().map(|d| d.embedding).collect());
            }

            let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            if can_retry && Self::should_retry(status) {
                tracing::warn!("Embedding endpoint returned {} (attempt {}), retrying", status, attempt);
                tokio::time::sleep(Self::retry_backoff(attempt)).await;
                continue;
            }
            return Err(RagError::Api { status, body });
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Embedder;
    use crate::utils::error::RagError;

    /// Letter-frequency vectors: similar wording gives similar vectors.
    pub struct LetterEmbedder;

    impl Embedder for LetterEmbedder {
        fn model(&self) -> &str {
            "letters"
        }

        fn batch_size(&self) -> usize {
            2
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(inputs
                .iter()
                .map(|text| {
                    let mut v = vec![0.0f32; 26];
                    for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                        v[(c as u8 - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }
}
