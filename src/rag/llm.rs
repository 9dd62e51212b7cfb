// src/rag/llm.rs
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::utils::error::RagError;

/// A chat model answering one system + user exchange.
#[allow(async_fn_in_trait)]
pub trait ChatModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String, RagError>;
}

/// OpenAI-compatible chat completions (Groq by default).
pub struct ChatCompletions {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl ChatCompletions {
    pub fn new(config: LlmConfig) -> Result<Self, RagError> {
        if config.api_key.trim().is_empty() {
            return Err(RagError::MissingCredential("GROQ_API_KEY"));
        }
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
            .map_err(|_| RagError::Format("LLM API key is not a valid header value".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model,
            temperature: config.temperature,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatModel for ChatCompletions {
    async fn complete(&self, system: &str, user: &str) -> Result<String, RagError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
        };
        tracing::debug!("Calling {} with model {}", self.endpoint, self.model);
        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::Api { status, body });
        }
        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| RagError::Format("chat response had no message content".to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_a_missing_credential() {
        let err = ChatCompletions::new(LlmConfig::new("  ".into())).err().unwrap();
        assert!(matches!(err, RagError::MissingCredential("GROQ_API_KEY")));
    }

    #[test]
    fn endpoint_follows_base_url() {
        let llm = ChatCompletions::new(LlmConfig::new("gsk_test".into())).unwrap();
        assert_eq!(llm.endpoint, "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(llm.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn request_shape() {
        let body = ChatRequest {
            model: "m",
            temperature: 0.2,
            messages: [
                ChatMessage { role: "system", content: "s" },
                ChatMessage { role: "user", content: "u" },
            ],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "u");
        assert_eq!(json["model"], "m");
    }
}
