// src/rag/prompt.rs
use super::store::ScoredEntry;

pub const SYSTEM_PROMPT: &str = "You are a precise M&A analyst focused on SEC 8-K Exhibit 2.1.\n\
Use ONLY the information found in the retrieved context.\n\
If something is not found, say so.";

/// `[Doc i] (source)\n<text>` blocks, 1-based, separated by blank lines.
pub fn format_docs(docs: &[ScoredEntry]) -> String {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| format!("[Doc {}] ({})\n{}", i + 1, doc.entry.source, doc.entry.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Sources in retrieval order, each once.
pub fn collect_sources(docs: &[ScoredEntry]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for doc in docs {
        if !out.contains(&doc.entry.source) {
            out.push(doc.entry.source.clone());
        }
    }
    out
}

pub fn user_prompt(question: &str, context: &str) -> String {
    format!(
        "Question:\n{question}\n\nContext:\n{context}\n\nInstructions:\n\
         1. Return a clear Markdown answer.\n\
         2. Then return a JSON code block summarizing deal terms.\n\
         3. Then list the file names used as citations."
    )
}
