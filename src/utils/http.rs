//! HTTP client utilities.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::pubmed::PubMedError;

/// Shared HTTP client with sensible defaults and an optional request-rate cap
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings and no rate limit
    pub fn new() -> Result<Self, PubMedError> {
        Self::with_settings(
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            Duration::from_secs(30),
            0,
        )
    }

    /// Create a client with a custom user agent, request timeout and rate cap.
    ///
    /// `requests_per_second == 0` disables rate limiting.
    pub fn with_settings(
        user_agent: &str,
        timeout: Duration,
        requests_per_second: u32,
    ) -> Result<Self, PubMedError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| PubMedError::Client(e.to_string()))?;

        let limiter = NonZeroU32::new(requests_per_second)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        Ok(Self {
            client: Arc::new(client),
            limiter,
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self {
            client,
            limiter: None,
        }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Whether outbound requests are rate limited
    pub fn is_rate_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Issue one GET and return the body of a successful response.
    ///
    /// Waits for a rate-limiter slot first. Non-success statuses are classified
    /// with [`PubMedError::from_status`]; transport failures with the
    /// `From<reqwest::Error>` conversion. No retry happens here.
    pub async fn get_text(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String, PubMedError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PubMedError::from_status(status, &body));
        }

        Ok(response.text().await?)
    }
}
