// src/rag/mod.rs
//! Retrieval over downloaded exhibits: chunk, embed, store, ask.

pub mod chunker;
pub mod embedder;
pub mod indexer;
pub mod llm;
pub mod prompt;
pub mod qa;
pub mod store;

pub use embedder::{Embedder, OpenAiEmbedder};
pub use indexer::{build_index, discover_documents, ticker_map, IndexStats};
pub use llm::{ChatCompletions, ChatModel};
pub use qa::{answer_question, Answer};
pub use store::VectorStore;
