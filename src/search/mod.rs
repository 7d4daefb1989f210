//! Search module - text analysis and lemma-based ranking / 搜索模块
//!
//! - morphology: word -> normal form + part of speech
//! - analyzer: HTML -> lemma counts, titles, highlighted snippets
//! - engine: ranked search over the index store

pub mod analyzer;
pub mod engine;
pub mod morphology;
pub mod schema;

pub use analyzer::TextAnalyzer;
pub use engine::SearchEngine;
pub use morphology::{Language, Morphology, SnowballMorphology};
pub use schema::{Pagination, SearchItem, SearchOutcome};
