// src/extractors/exhibits.rs
//! Exhibit detection by filename.
//!
//! Filers name exhibit files however their filing agent likes
//! (`d123ex21.htm`, `ex2-1.htm`, `dex2_1.htm`, ...). Matching is a
//! case-insensitive substring test against each tier's known spellings;
//! tiers are ordered by preference.

use crate::edgar::models::{ExhibitClass, ExhibitTarget};

/// Exhibit 2.1 spellings (merger agreement).
pub const PRIMARY_PATTERNS: &[&str] = &[
    "ex2-1", "ex2_1", "ex21.", "dex21", "exhibit2.1", "ex2d1", "dex2-1", "dex2_1",
];

/// Exhibit 10.1 spellings (material contract).
pub const FALLBACK_PATTERNS: &[&str] = &[
    "ex10.1", "ex10_1", "ex101.", "dex101", "exhibit10.1", "ex10d1", "dex10-1", "dex10_1",
];

#[derive(Debug, Clone)]
pub struct ExhibitTier {
    pub class: ExhibitClass,
    pub patterns: Vec<String>,
}

impl ExhibitTier {
    pub fn new(class: ExhibitClass, patterns: &[&str]) -> Self {
        Self {
            class,
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    fn matches(&self, lowered_name: &str) -> bool {
        self.patterns.iter().any(|p| lowered_name.contains(p.as_str()))
    }
}

/// EX-2.1 first, EX-10.1 as the fallback.
pub fn default_tiers() -> Vec<ExhibitTier> {
    vec![
        ExhibitTier::new(ExhibitClass::Primary, PRIMARY_PATTERNS),
        ExhibitTier::new(ExhibitClass::Fallback, FALLBACK_PATTERNS),
    ]
}

pub fn is_html(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".htm") || lower.ends_with(".html")
}

/// Class of the first tier whose patterns hit `name`; non-HTML names are
/// never exhibits.
pub fn classify(name: &str, tiers: &[ExhibitTier]) -> Option<ExhibitClass> {
    if !is_html(name) {
        return None;
    }
    let lower = name.to_lowercase();
    tiers.iter().find(|tier| tier.matches(&lower)).map(|tier| tier.class)
}

/// Exhibit targets in one accession's listing, in listing order.
pub fn classify_listing(accession: &str, names: &[String], tiers: &[ExhibitTier]) -> Vec<ExhibitTarget> {
    names
        .iter()
        .filter_map(|name| {
            classify(name, tiers).map(|class| ExhibitTarget {
                accession_number: accession.to_string(),
                filename: name.clone(),
                class,
            })
        })
        .collect()
}

/// Keeps only the best tier present across all of a company's filings.
pub fn select_preferred(found: Vec<ExhibitTarget>, tiers: &[ExhibitTier]) -> Vec<ExhibitTarget> {
    let Some(best) = tiers
        .iter()
        .map(|tier| tier.class)
        .find(|class| found.iter().any(|t| t.class == *class))
    else {
        return Vec::new();
    };
    found.into_iter().filter(|t| t.class == best).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classifies_common_agent_spellings() {
        let tiers = default_tiers();
        for name in ["d123ex2-1.htm", "EX2_1.HTM", "dex21.htm", "exhibit2.1.html", "tm2012ex2d1.htm"] {
            assert_eq!(classify(name, &tiers), Some(ExhibitClass::Primary), "{name}");
        }
        for name in ["ex10.1.htm", "d55dex101.htm", "ex10d1.html", "dex10_1.htm"] {
            assert_eq!(classify(name, &tiers), Some(ExhibitClass::Fallback), "{name}");
        }
        assert_eq!(classify("d123ex99-1.htm", &tiers), None);
        assert_eq!(classify("main8k.htm", &tiers), None);
    }

    #[test]
    fn only_html_names_count() {
        let tiers = default_tiers();
        assert_eq!(classify("ex2-1.pdf", &tiers), None);
        assert_eq!(classify("ex21.txt", &tiers), None);
        assert_eq!(classify("dex21.jpg", &tiers), None);
    }

    #[test]
    fn primary_wins_when_a_name_matches_both_tiers() {
        let tiers = default_tiers();
        assert_eq!(classify("ex2-1_ex10.1.htm", &tiers), Some(ExhibitClass::Primary));
    }

    #[test]
    fn one_filing_can_fill_both_buckets() {
        let tiers = default_tiers();
        let found = classify_listing("acc-1", &names(&["main.htm", "ex2-1.htm", "ex10_1.htm"]), &tiers);
        let classes: Vec<_> = found.iter().map(|t| t.class).collect();
        assert_eq!(classes, vec![ExhibitClass::Primary, ExhibitClass::Fallback]);
    }

    #[test]
    fn primary_anywhere_suppresses_all_fallbacks() {
        let tiers = default_tiers();
        let mut found = classify_listing("acc-1", &names(&["ex10_1.htm"]), &tiers);
        found.extend(classify_listing("acc-2", &names(&["d9ex21.htm", "ex101.htm"]), &tiers));
        let selected = select_preferred(found, &tiers);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].accession_number, "acc-2");
        assert_eq!(selected[0].class, ExhibitClass::Primary);
    }

    #[test]
    fn fallback_used_when_no_primary() {
        let tiers = default_tiers();
        let mut found = classify_listing("acc-1", &names(&["ex10_1.htm"]), &tiers);
        found.extend(classify_listing("acc-2", &names(&["ex101.htm"]), &tiers));
        let selected = select_preferred(found, &tiers);
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|t| t.class == ExhibitClass::Fallback));
        assert!(select_preferred(Vec::new(), &tiers).is_empty());
    }
}
