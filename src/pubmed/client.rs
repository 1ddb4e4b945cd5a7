//! HTTP implementation of [`EUtilsApi`].

use async_trait::async_trait;

use super::parse::{parse_article_set, parse_count, parse_id_list, parse_id_page, parse_mesh_text};
use super::{EUtilsApi, PubMedError};
use crate::config::Config;
use crate::models::{Article, IdPage, SortBy};
use crate::utils::{with_retry_detailed, HttpClient, RetryConfig, RetryReport};

const ESEARCH: &str = "esearch.fcgi";
const EFETCH: &str = "efetch.fcgi";

/// Identifiers per efetch request; NCBI asks for POST beyond roughly 200
const EFETCH_BATCH_SIZE: usize = 200;

/// PubMed/MeSH client over NCBI E-utilities
///
/// Every request carries the `tool`, `email` and `api_key` identity parameters
/// when configured, waits for the shared rate limiter, and is retried on
/// transient failures according to the client's [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct PubMedClient {
    http: HttpClient,
    base_url: String,
    identity: Vec<(String, String)>,
    retry: RetryConfig,
}

impl PubMedClient {
    /// Create a client from configuration
    pub fn from_config(config: &Config) -> Result<Self, PubMedError> {
        let user_agent = format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
        let http = HttpClient::with_settings(
            &user_agent,
            config.timeout(),
            config.requests_per_second(),
        )?;

        let mut identity = vec![("tool".to_string(), config.ncbi.tool.clone())];
        if let Some(email) = &config.ncbi.email {
            identity.push(("email".to_string(), email.clone()));
        }
        if let Some(key) = &config.ncbi.api_key {
            identity.push(("api_key".to_string(), key.clone()));
        }

        tracing::debug!(
            "PubMed client for {} ({} req/s, {} attempts)",
            config.ncbi.base_url,
            config.requests_per_second(),
            config.retry.max_attempts
        );

        Ok(Self {
            http,
            base_url: config.ncbi.base_url.trim_end_matches('/').to_string(),
            identity,
            retry: config.retry_config(),
        })
    }

    /// Create with a custom HTTP client (for testing)
    pub fn with_client(http: HttpClient, base_url: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            identity: vec![("tool".to_string(), env!("CARGO_PKG_NAME").to_string())],
            retry,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// GET an endpoint with retry, returning the body and the attempt log
    pub async fn fetch_detailed(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> RetryReport<String> {
        let url = self.endpoint(endpoint);
        let params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .chain(self.identity.iter().cloned())
            .collect();

        let http = self.http.clone();
        let url_for_retry = url.clone();

        with_retry_detailed(self.retry, &url, || {
            let http = http.clone();
            let url = url_for_retry.clone();
            let params = params.clone();
            async move { http.get_text(&url, &params).await }
        })
        .await
    }

    /// GET an endpoint with retry
    pub async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<String, PubMedError> {
        self.fetch_detailed(endpoint, params).await.result
    }
}

fn require_term(term: &str) -> Result<&str, PubMedError> {
    let term = term.trim();
    if term.is_empty() {
        return Err(PubMedError::InvalidInput(
            "search term must not be empty".to_string(),
        ));
    }
    Ok(term)
}

#[async_trait]
impl EUtilsApi for PubMedClient {
    async fn count(&self, term: &str) -> Result<u64, PubMedError> {
        let term = require_term(term)?;
        let xml = self
            .fetch(
                ESEARCH,
                &[
                    ("db", "pubmed".to_string()),
                    ("term", term.to_string()),
                    ("rettype", "count".to_string()),
                    ("retmode", "xml".to_string()),
                ],
            )
            .await?;

        let count = parse_count(&xml)?;
        tracing::debug!("PubMed count for '{}': {}", term, count);
        Ok(count)
    }

    async fn search_ids(
        &self,
        term: &str,
        retmax: usize,
        sort: SortBy,
    ) -> Result<IdPage, PubMedError> {
        let term = require_term(term)?;
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", term.to_string()),
            ("retmax", retmax.to_string()),
            ("retmode", "json".to_string()),
        ];
        if let Some(sort) = sort.esearch_param() {
            params.push(("sort", sort.to_string()));
        }

        let json = self.fetch(ESEARCH, &params).await?;
        parse_id_page(&json)
    }

    async fn mesh_headings(&self, term: &str) -> Result<Vec<String>, PubMedError> {
        let term = require_term(term)?;
        let xml = self
            .fetch(
                ESEARCH,
                &[
                    ("db", "mesh".to_string()),
                    ("term", term.to_string()),
                    ("retmode", "xml".to_string()),
                ],
            )
            .await?;

        let ids = parse_id_list(&xml)?;
        if ids.is_empty() {
            tracing::info!("No MeSH IDs found for term: {}", term);
            return Ok(Vec::new());
        }

        let text = self
            .fetch(
                EFETCH,
                &[
                    ("db", "mesh".to_string()),
                    ("id", ids.join(",")),
                    ("retmode", "text".to_string()),
                ],
            )
            .await?;

        Ok(parse_mesh_text(&text))
    }

    async fn fetch_articles(&self, pmids: &[String]) -> Result<Vec<Article>, PubMedError> {
        let mut articles = Vec::with_capacity(pmids.len());

        for batch in pmids.chunks(EFETCH_BATCH_SIZE) {
            let xml = self
                .fetch(
                    EFETCH,
                    &[
                        ("db", "pubmed".to_string()),
                        ("id", batch.join(",")),
                        ("retmode", "xml".to_string()),
                    ],
                )
                .await?;
            articles.extend(parse_article_set(&xml)?);
        }

        Ok(articles)
    }
}
