// src/rag/qa.rs
use serde::Serialize;

use super::embedder::Embedder;
use super::llm::ChatModel;
use super::prompt::{collect_sources, format_docs, user_prompt, SYSTEM_PROMPT};
use super::store::VectorStore;
use crate::utils::error::RagError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub answer_markdown: String,
    pub sources: Vec<String>,
}

impl Answer {
    /// Answer text, then a citations block with one bullet per source.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n\n--- CITATIONS ---\n", self.answer_markdown);
        for source in &self.sources {
            out.push_str(&format!("• {}\n", source));
        }
        out
    }
}

/// Retrieve `top_k` chunks for `question` and ask the model about them.
pub async fn answer_question<E: Embedder, C: ChatModel>(
    store: &VectorStore,
    embedder: &E,
    chat: &C,
    question: &str,
    top_k: usize,
) -> Result<Answer, RagError> {
    let query = embedder
        .embed(&[question.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RagError::Format("embedder returned no vector for the question".to_string()))?;

    let docs = store.search(&query, top_k)?;
    tracing::info!("Retrieved {} chunk(s) for the question", docs.len());

    let context = format_docs(&docs);
    let answer_markdown = chat.complete(SYSTEM_PROMPT, &user_prompt(question, &context)).await?;
    Ok(Answer { answer_markdown, sources: collect_sources(&docs) })
}
