// src/edgar/mod.rs
pub mod client;
pub mod filings;
pub mod listing;
pub mod models;
pub mod resolver;
pub mod similarity;

pub use client::{EdgarClient, Fetcher};
pub use filings::{gather_filings, FilingQuery};
pub use models::{Cik, ExhibitClass, ExhibitTarget, Filing};
pub use resolver::{BroadLookup, CompanyDirectory, LegacyOverrides, Resolver};
