//! Search request and response models.

use serde::{Deserialize, Serialize};

use super::PaperDetails;

/// Upper bound accepted for `num_results`; esearch does not page past this
pub const MAX_RESULTS: usize = 10_000;

/// Ordering of search results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// PubMed best-match ranking
    #[default]
    Relevance,
    /// Newest publications first
    DateDesc,
    /// Oldest publications first (within the returned page)
    DateAsc,
}

impl SortBy {
    /// Value for the esearch `sort` parameter, if any
    pub fn esearch_param(&self) -> Option<&'static str> {
        match self {
            SortBy::Relevance => None,
            SortBy::DateDesc | SortBy::DateAsc => Some("pub_date"),
        }
    }
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "relevance" => Ok(SortBy::Relevance),
            "date_desc" => Ok(SortBy::DateDesc),
            "date_asc" => Ok(SortBy::DateAsc),
            other => Err(format!(
                "unknown sort_by '{}': expected relevance, date_desc or date_asc",
                other
            )),
        }
    }
}

/// Parameters for a keyword search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Keywords, AND-joined into one query
    pub keywords: Vec<String>,

    /// Restrict to a journal title
    pub journal: Option<String>,

    /// Maximum number of identifiers to return
    pub num_results: usize,

    /// Result ordering
    pub sort_by: SortBy,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            journal: None,
            num_results: 10,
            sort_by: SortBy::Relevance,
        }
    }
}

impl SearchRequest {
    /// Create a request for the given keywords
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set journal filter
    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.journal = Some(journal.into());
        self
    }

    /// Set maximum results
    pub fn num_results(mut self, n: usize) -> Self {
        self.num_results = n;
        self
    }

    /// Set sort order
    pub fn sort_by(mut self, sort: SortBy) -> Self {
        self.sort_by = sort;
        self
    }
}

/// A page of identifiers as returned by esearch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdPage {
    /// Total number of matching records upstream
    pub total: u64,

    /// Identifiers in upstream order
    pub ids: Vec<String>,
}

/// Result of a keyword search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Query string sent to PubMed
    pub query: String,

    /// Total number of matching records (may exceed `pubmed_ids.len()`)
    pub total_results: u64,

    /// Identifiers in the requested order
    pub pubmed_ids: Vec<String>,

    /// Details for each identifier, same order
    pub results: Vec<PaperDetails>,
}

/// Publication count for one search term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: u64,
}
