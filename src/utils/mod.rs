//! Utility modules supporting PubMed requests.
//!
//! - [`HttpClient`]: shared reqwest client with an optional request-rate cap
//! - [`RetryConfig`]: exponential backoff settings
//! - [`with_retry`] / [`with_retry_detailed`]: run an async operation, retrying
//!   transient failures
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use pubmed_enhanced::pubmed::PubMedError;
//! use pubmed_enhanced::utils::{with_retry, RetryConfig};
//! use std::time::Duration;
//!
//! # async fn fetch_count() -> Result<u64, PubMedError> { Ok(0) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), PubMedError> {
//! let config = RetryConfig::new(3, Duration::from_secs(1));
//! let count = with_retry(config, "esearch", || fetch_count()).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod retry;

pub use http::HttpClient;
pub use retry::{
    with_retry, with_retry_detailed, AttemptOutcome, FetchAttempt, RetryConfig, RetryReport,
};
