// src/bin/exhibit_ask.rs
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use edgar_exhibits::config::{EmbeddingArgs, LlmConfig, DEFAULT_INDEX_DIR, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL, DEFAULT_TOP_K};
use edgar_exhibits::rag::{answer_question, Answer, ChatCompletions, Embedder, OpenAiEmbedder, VectorStore};
use edgar_exhibits::utils::error::RagError;
use edgar_exhibits::utils::{logging, AppError};

/// Answers questions about merger agreements from the vector index, with citations.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ask one question and exit; otherwise start an interactive prompt
    #[arg(short, long)]
    question: Option<String>,

    /// Index directory built by exhibit-index
    #[arg(long, default_value = DEFAULT_INDEX_DIR)]
    db: PathBuf,

    /// Chunks retrieved per question
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Print {answer_markdown, sources} as JSON
    #[arg(long)]
    json: bool,

    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    groq_api_key: Option<String>,

    #[arg(long, env = "LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL)]
    llm_base_url: String,

    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    llm_model: String,

    #[command(flatten)]
    embedding: EmbeddingArgs,
}

fn print_answer(answer: &Answer, json: bool) -> Result<(), AppError> {
    if json {
        let text = serde_json::to_string_pretty(answer).map_err(|e| AppError::Processing(e.to_string()))?;
        println!("{}", text);
    } else {
        print!("{}", answer.render());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    logging::setup_logging();
    let args = Args::parse();

    // Configuration problems are fatal before any retrieval.
    let store = VectorStore::open(&args.db)?;
    let api_key = args
        .groq_api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or(RagError::MissingCredential("GROQ_API_KEY"))?;
    let chat = ChatCompletions::new(LlmConfig {
        base_url: args.llm_base_url.clone(),
        model: args.llm_model.clone(),
        ..LlmConfig::new(api_key)
    })?;
    let embedder = OpenAiEmbedder::new(args.embedding.clone().into_config())?;
    store.check_model(embedder.model())?;
    tracing::info!("Loaded index with {} chunk(s) from {}", store.len(), args.db.display());

    if let Some(question) = &args.question {
        let answer = answer_question(&store, &embedder, &chat, question, args.top_k).await?;
        return print_answer(&answer, args.json);
    }

    println!("Interactive mode: type a question or 'exit'");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Q> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let question = line?;
        let question = question.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }
        match answer_question(&store, &embedder, &chat, question, args.top_k).await {
            Ok(answer) => print_answer(&answer, args.json)?,
            Err(e) => tracing::error!("Could not answer: {}", e),
        }
    }
    Ok(())
}
