// src/lib.rs
pub mod batch;
pub mod config;
pub mod edgar;
pub mod extractors;
pub mod metadata;
pub mod pipeline;
pub mod rag;
pub mod render;
pub mod storage;
pub mod utils;
