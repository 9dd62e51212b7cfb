// src/rag/chunker.rs
//! Recursive character splitting.
//!
//! Text is cut on the coarsest separator it contains (paragraphs, then
//! lines, then words, then characters); pieces that are still too long are
//! split again with the next separator. Adjacent small pieces are merged back
//! up to `chunk_size` characters, and each chunk starts with up to
//! `chunk_overlap` characters carried over from the previous one.

use std::collections::VecDeque;

use crate::config::ChunkConfig;

const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn split_text(text: &str, config: ChunkConfig) -> Vec<String> {
    split_recursive(text, SEPARATORS, config)
}

fn split_recursive(text: &str, separators: &[&str], config: ChunkConfig) -> Vec<String> {
    let position = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let finer = separators.get(position + 1..).unwrap_or(&[]);

    let pieces: Vec<&str> = if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).filter(|p| !p.is_empty()).collect()
    };

    let mut chunks = Vec::new();
    let mut small: Vec<&str> = Vec::new();
    for piece in pieces {
        if char_len(piece) < config.chunk_size {
            small.push(piece);
            continue;
        }
        if !small.is_empty() {
            chunks.extend(merge(&small, separator, config));
            small.clear();
        }
        if finer.is_empty() {
            chunks.push(piece.to_string());
        } else {
            chunks.extend(split_recursive(piece, finer, config));
        }
    }
    if !small.is_empty() {
        chunks.extend(merge(&small, separator, config));
    }
    chunks
}

fn merge(pieces: &[&str], separator: &str, config: ChunkConfig) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut out = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    let flush = |window: &VecDeque<&str>, out: &mut Vec<String>| {
        let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
    };

    for piece in pieces {
        let len = char_len(piece);
        let joiner = if window.is_empty() { 0 } else { sep_len };
        if total + len + joiner > config.chunk_size && !window.is_empty() {
            flush(&window, &mut out);
            // Drop from the front until what is left fits the overlap and
            // leaves room for the incoming piece.
            while total > config.chunk_overlap
                || (total > 0 && total + len + if window.is_empty() { 0 } else { sep_len } > config.chunk_size)
            {
                let Some(first) = window.pop_front() else { break };
                total -= char_len(first) + if window.is_empty() { 0 } else { sep_len };
            }
        }
        total += len + if window.is_empty() { 0 } else { sep_len };
        window.push_back(piece);
    }
    if !window.is_empty() {
        flush(&window, &mut out);
    }
    out
}
