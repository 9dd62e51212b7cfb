// src/extractors/mod.rs
pub mod exhibits;
pub mod text;

// Re-export key extraction types for convenience
pub use exhibits::{classify, classify_listing, default_tiers, select_preferred, ExhibitTier};
pub use text::{extract_file_text, html_to_text, truncate_chars};
