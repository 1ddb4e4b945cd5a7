//! Core data models for PubMed records, searches and PICO queries.

mod article;
mod pico;
mod search;

pub use article::{Article, ArticleBuilder, PaperDetails, MAX_KEYWORDS};
pub use pico::{PicoElement, PicoLabel, PicoQuery, PicoSearchResult, QueryCombination};
pub use search::{IdPage, SearchRequest, SearchResponse, SortBy, TermCount, MAX_RESULTS};
