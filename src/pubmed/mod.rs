//! NCBI E-utilities access for PubMed and MeSH.
//!
//! The [`EUtilsApi`] trait is the seam between the operations exposed by this
//! crate and the upstream service. [`PubMedClient`] implements it over HTTP with
//! retry and rate limiting; [`MockEUtils`] implements it in memory for tests.
//!
//! # Endpoints
//!
//! - `esearch.fcgi` with `db=pubmed`: publication counts (XML) and ranked
//!   identifier pages (JSON)
//! - `esearch.fcgi` with `db=mesh`: MeSH UIDs for a term (XML)
//! - `efetch.fcgi` with `db=mesh`: MeSH records (plain text)
//! - `efetch.fcgi` with `db=pubmed`: article records (XML)

mod client;
pub mod mock;
mod parse;
mod query;

pub use client::PubMedClient;
pub use mock::MockEUtils;
pub use parse::{parse_article_set, parse_count, parse_id_list, parse_id_page, parse_mesh_text};
pub use query::{build_search_query, is_pubmed_id};

use async_trait::async_trait;

use crate::models::{Article, IdPage, SortBy};

/// Primitive upstream calls, each one or two E-utilities requests
#[async_trait]
pub trait EUtilsApi: Send + Sync + std::fmt::Debug {
    /// Number of PubMed records matching a query
    async fn count(&self, term: &str) -> Result<u64, PubMedError>;

    /// Ranked PubMed identifiers for a query
    async fn search_ids(
        &self,
        term: &str,
        retmax: usize,
        sort: SortBy,
    ) -> Result<IdPage, PubMedError>;

    /// MeSH headings matching a term, in upstream order
    async fn mesh_headings(&self, term: &str) -> Result<Vec<String>, PubMedError>;

    /// Article records for the given identifiers; missing ones are simply absent
    async fn fetch_articles(&self, pmids: &[String]) -> Result<Vec<Article>, PubMedError>;
}

/// Errors surfaced by PubMed operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PubMedError {
    /// Retryable upstream condition: rate limit, 5xx, timeout, connection failure
    #[error("Transient fetch error{}: {message}", fmt_status(.status))]
    TransientFetch {
        status: Option<u16>,
        message: String,
    },

    /// Non-retryable upstream failure, or retries exhausted
    #[error("Terminal fetch error{} after {attempts} attempt(s): {message}", fmt_status(.status))]
    TerminalFetch {
        status: Option<u16>,
        message: String,
        attempts: u32,
    },

    /// The caller violated a precondition
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Valid request, no matching record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl PubMedError {
    /// A response body that could not be parsed
    pub fn malformed(message: impl Into<String>) -> Self {
        PubMedError::TerminalFetch {
            status: None,
            message: format!("malformed response: {}", message.into()),
            attempts: 1,
        }
    }

    /// Whether the fetcher may retry after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, PubMedError::TransientFetch { .. })
    }

    /// Short machine-readable kind, used at the MCP boundary
    pub fn kind(&self) -> &'static str {
        match self {
            PubMedError::TransientFetch { .. } => "TransientFetchError",
            PubMedError::TerminalFetch { .. } => "TerminalFetchError",
            PubMedError::InvalidInput(_) => "InvalidInputError",
            PubMedError::NotFound(_) => "NotFoundError",
            PubMedError::Client(_) => "ClientError",
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let snippet: String = body.chars().take(200).collect();
        let message = if snippet.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        } else {
            snippet.trim().to_string()
        };

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            PubMedError::TransientFetch {
                status: Some(status.as_u16()),
                message,
            }
        } else {
            PubMedError::TerminalFetch {
                status: Some(status.as_u16()),
                message,
                attempts: 1,
            }
        }
    }

    /// Exhausted retries: the last transient error becomes terminal
    pub fn into_terminal(self, attempts: u32) -> Self {
        match self {
            PubMedError::TransientFetch { status, message } => PubMedError::TerminalFetch {
                status,
                message,
                attempts,
            },
            PubMedError::TerminalFetch {
                status, message, ..
            } => PubMedError::TerminalFetch {
                status,
                message,
                attempts,
            },
            other => other,
        }
    }
}

impl From<reqwest::Error> for PubMedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            return PubMedError::TransientFetch {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return PubMedError::from_status(status, &err.to_string());
        }
        PubMedError::TerminalFetch {
            status: None,
            message: err.to_string(),
            attempts: 1,
        }
    }
}

impl From<serde_json::Error> for PubMedError {
    fn from(err: serde_json::Error) -> Self {
        PubMedError::malformed(format!("JSON: {}", err))
    }
}

impl From<quick_xml::DeError> for PubMedError {
    fn from(err: quick_xml::DeError) -> Self {
        PubMedError::malformed(format!("XML: {}", err))
    }
}
