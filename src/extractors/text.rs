// src/extractors/text.rs
use std::path::Path;

use scraper::{node::Node, Html};

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// Visible text of an HTML document: every text node trimmed, empty ones
/// dropped, joined with single spaces. Malformed markup is parsed leniently,
/// so this never fails.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text_node) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text_node.text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}

/// First `max_chars` characters (not bytes) of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Text of an HTML file on disk, truncated. Unreadable files give "".
pub fn extract_file_text(path: &Path, max_chars: usize) -> String {
    match std::fs::read(path) {
        Ok(bytes) => truncate_chars(&html_to_text(&String::from_utf8_lossy(&bytes)), max_chars),
        Err(e) => {
            tracing::warn!("Could not read {}: {}", path.display(), e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_hidden_elements() {
        let html = r#"<html><head><title>EX-2.1</title><style>p { color: red }</style></head>
            <body><p>AGREEMENT AND <b>PLAN</b> OF MERGER</p>
            <script>var x = 1;</script>
            <table><tr><td>Parent</td><td> Merger&nbsp;Sub </td></tr></table></body></html>"#;
        let text = html_to_text(html);
        assert_eq!(text, "EX-2.1 AGREEMENT AND PLAN OF MERGER Parent Merger\u{a0}Sub");
        assert!(!text.contains("color"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn malformed_markup_does_not_fail() {
        assert_eq!(html_to_text("<div><p>unclosed <b>bold"), "unclosed bold");
        assert!(html_to_text("<<<>>>").len() <= 6);
        assert_eq!(html_to_text(""), "");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");

        let big = format!("<p>{}</p>", "é".repeat(20_000));
        let text = truncate_chars(&html_to_text(&big), 8000);
        assert_eq!(text.chars().count(), 8000);
    }

    #[test]
    fn missing_file_gives_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(extract_file_text(&dir.path().join("nope.htm"), 8000), "");

        let path = dir.path().join("ok.htm");
        std::fs::write(&path, b"<p>Merger \xff Agreement</p>").unwrap();
        assert_eq!(extract_file_text(&path, 8000), "Merger \u{fffd} Agreement");
    }
}
