//! The five PubMed operations exposed as MCP tools and CLI commands.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::Config;
use crate::models::{
    PaperDetails, PicoQuery, PicoSearchResult, SearchRequest, SearchResponse, SortBy, TermCount,
    MAX_RESULTS,
};
use crate::pico::PicoCombiner;
use crate::pubmed::{build_search_query, is_pubmed_id, EUtilsApi, PubMedClient, PubMedError};

/// PubMed operations over an [`EUtilsApi`]
#[derive(Debug, Clone)]
pub struct PubMedService {
    api: Arc<dyn EUtilsApi>,
    concurrency: usize,
}

impl PubMedService {
    pub fn new(api: Arc<dyn EUtilsApi>, concurrency: usize) -> Self {
        Self {
            api,
            concurrency: concurrency.max(1),
        }
    }

    /// Build a service backed by the live E-utilities client
    pub fn from_config(config: &Config) -> Result<Self, PubMedError> {
        let client = PubMedClient::from_config(config)?;
        Ok(Self::new(
            Arc::new(client),
            config.max_concurrent_requests(),
        ))
    }

    pub fn api(&self) -> &Arc<dyn EUtilsApi> {
        &self.api
    }

    /// Keyword search returning ranked identifiers and their details
    pub async fn search_pubmed(&self, request: SearchRequest) -> Result<SearchResponse, PubMedError> {
        if request.num_results == 0 {
            return Err(PubMedError::InvalidInput(
                "num_results must be at least 1".to_string(),
            ));
        }

        let query = build_search_query(&request.keywords, request.journal.as_deref())?;
        let retmax = request.num_results.min(MAX_RESULTS);

        tracing::debug!(
            "Searching PubMed: {} (max {}, sort {:?})",
            query,
            retmax,
            request.sort_by
        );

        let mut page = self.api.search_ids(&query, retmax, request.sort_by).await?;
        page.ids.truncate(retmax);
        if request.sort_by == SortBy::DateAsc {
            page.ids.reverse();
        }

        let results = self.format_paper_details(&page.ids).await?;

        Ok(SearchResponse {
            query,
            total_results: page.total,
            pubmed_ids: page.ids,
            results,
        })
    }

    /// MeSH headings for a term
    pub async fn get_mesh_terms(&self, term: &str) -> Result<Vec<String>, PubMedError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(PubMedError::InvalidInput(
                "search_word must not be empty".to_string(),
            ));
        }
        self.api.mesh_headings(term).await
    }

    /// Publication count per term, in input order
    ///
    /// Each distinct term is fetched once; duplicates repeat its count.
    pub async fn get_pubmed_count(&self, terms: &[String]) -> Result<Vec<TermCount>, PubMedError> {
        if terms.is_empty() {
            return Err(PubMedError::InvalidInput(
                "search_terms must contain at least one term".to_string(),
            ));
        }
        if let Some(blank) = terms.iter().position(|t| t.trim().is_empty()) {
            return Err(PubMedError::InvalidInput(format!(
                "search_terms[{}] is blank",
                blank
            )));
        }

        let mut seen = HashSet::new();
        let distinct: Vec<String> = terms
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect();

        let counts: HashMap<String, u64> = stream::iter(distinct)
            .map(|term| {
                let api = Arc::clone(&self.api);
                async move { api.count(&term).await.map(|count| (term, count)) }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(terms
            .iter()
            .map(|term| TermCount {
                term: term.clone(),
                count: counts.get(term).copied().unwrap_or_default(),
            })
            .collect())
    }

    /// Bibliographic details per identifier, in input order
    pub async fn format_paper_details(
        &self,
        pubmed_ids: &[String],
    ) -> Result<Vec<PaperDetails>, PubMedError> {
        let ids: Vec<String> = pubmed_ids.iter().map(|id| id.trim().to_string()).collect();

        let mut wanted: Vec<String> = Vec::new();
        for id in ids.iter().filter(|id| is_pubmed_id(id)) {
            if !wanted.contains(id) {
                wanted.push(id.clone());
            }
        }

        let mut articles = HashMap::new();
        if !wanted.is_empty() {
            for article in self.api.fetch_articles(&wanted).await? {
                articles.insert(article.pubmed_id.clone(), article);
            }
        }

        let details: Vec<PaperDetails> = ids
            .into_iter()
            .map(|id| match articles.get(&id) {
                Some(article) => PaperDetails::Found {
                    article: article.clone(),
                },
                None => PaperDetails::NotFound { pubmed_id: id },
            })
            .collect();

        let missing = details.iter().filter(|d| !d.is_found()).count();
        if missing > 0 {
            tracing::info!("{} of {} PubMed IDs not found", missing, details.len());
        }

        Ok(details)
    }

    /// Counts for every PICO element and cumulative combination
    pub async fn pico_search(&self, query: &PicoQuery) -> Result<PicoSearchResult, PubMedError> {
        PicoCombiner::new(Arc::clone(&self.api), self.concurrency)
            .combine(query)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubmed::mock::make_article;
    use crate::pubmed::MockEUtils;
    use tokio_test::{assert_err, assert_ok};

    fn service() -> (Arc<MockEUtils>, PubMedService) {
        let mock = Arc::new(MockEUtils::new());
        let service = PubMedService::new(mock.clone(), 3);
        (mock, service)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_search_respects_num_results() {
        let (mock, service) = service();
        mock.set_search_page("(asthma)", 500, &["5", "4", "3", "2", "1"]);
        mock.add_article(make_article("5", "Five"));

        let response = assert_ok!(
            service
                .search_pubmed(SearchRequest::new(["asthma"]).num_results(3))
                .await
        );

        assert_eq!(response.query, "(asthma)");
        assert_eq!(response.total_results, 500);
        assert_eq!(response.pubmed_ids, vec!["5", "4", "3"]);
        assert_eq!(response.results.len(), 3);
        assert!(response.results[0].is_found());
        assert!(!response.results[1].is_found());
    }

    #[tokio::test]
    async fn test_search_date_asc_reverses_page() {
        let (mock, service) = service();
        mock.set_search_page("(sepsis) AND \"BMJ\"[Journal]", 3, &["30", "20", "10"]);

        let response = assert_ok!(
            service
                .search_pubmed(
                    SearchRequest::new(["sepsis"])
                        .journal("BMJ")
                        .sort_by(SortBy::DateAsc)
                )
                .await
        );

        assert_eq!(response.pubmed_ids, vec!["10", "20", "30"]);
    }

    #[tokio::test]
    async fn test_search_rejects_bad_input() {
        let (mock, service) = service();

        assert_err!(service.search_pubmed(SearchRequest::new(Vec::<String>::new())).await);
        assert_err!(
            service
                .search_pubmed(SearchRequest::new(["asthma"]).num_results(0))
                .await
        );
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mesh_terms() {
        let (mock, service) = service();
        mock.set_mesh_headings("diabetes", &["Diabetes Mellitus", "Diabetes Insipidus"]);

        let headings = assert_ok!(service.get_mesh_terms(" diabetes ").await);
        assert_eq!(headings, vec!["Diabetes Mellitus", "Diabetes Insipidus"]);

        assert!(matches!(
            service.get_mesh_terms("  ").await,
            Err(PubMedError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_count_duplicates_fetched_once() {
        let (mock, service) = service();
        mock.set_count("covid", 250_000);
        mock.set_count("asthma", 180_000);

        let single = assert_ok!(service.get_pubmed_count(&strings(&["covid"])).await);
        let repeated = assert_ok!(
            service
                .get_pubmed_count(&strings(&["covid", "asthma", "covid"]))
                .await
        );

        assert_eq!(single[0].count, 250_000);
        assert_eq!(repeated.len(), 3);
        assert_eq!(repeated[0], single[0]);
        assert_eq!(repeated[2], single[0]);
        assert_eq!(repeated[1].count, 180_000);
        assert_eq!(mock.count_calls("covid"), 2);
        assert_eq!(mock.count_calls("asthma"), 1);
    }

    #[tokio::test]
    async fn test_count_failure_aborts() {
        let (mock, service) = service();
        mock.set_count("covid", 1);
        mock.set_count_error(
            "broken",
            PubMedError::TerminalFetch {
                status: Some(400),
                message: "bad".to_string(),
                attempts: 1,
            },
        );

        let err = assert_err!(
            service
                .get_pubmed_count(&strings(&["covid", "broken"]))
                .await
        );
        assert_eq!(err.kind(), "TerminalFetchError");
        assert_err!(service.get_pubmed_count(&[]).await);
    }

    #[tokio::test]
    async fn test_count_runs_on_spawned_task() {
        let (mock, service) = service();
        mock.set_count("sepsis", 7);
        let service = Arc::new(service);
        let terms = strings(&["sepsis", "sepsis"]);

        let handle = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.get_pubmed_count(&terms).await }
        });
        let counts = assert_ok!(handle.await.unwrap());

        assert_eq!(counts[0].count, 7);
        assert_eq!(counts[1], counts[0]);
        assert_eq!(mock.count_calls("sepsis"), 1);
    }

    #[tokio::test]
    async fn test_details_marks_not_found_alongside_valid() {
        let (mock, service) = service();
        mock.add_article(make_article("31452104", "Real paper"));

        let details = assert_ok!(
            service
                .format_paper_details(&strings(&["0000000", "31452104", "abc"]))
                .await
        );

        assert_eq!(details.len(), 3);
        assert_eq!(details[0].pubmed_id(), "0000000");
        assert!(!details[0].is_found());
        assert_eq!(details[1].article().unwrap().title, "Real paper");
        assert!(!details[2].is_found());
        assert_eq!(mock.calls(), vec!["fetch:0000000,31452104"]);
    }

    #[tokio::test]
    async fn test_details_empty_list_makes_no_request() {
        let (mock, service) = service();
        let details = assert_ok!(service.format_paper_details(&[]).await);
        assert!(details.is_empty());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pico_search_delegates_to_combiner() {
        let (mock, service) = service();
        mock.set_count("(A)", 10);

        let query = PicoQuery {
            p_terms: strings(&["A"]),
            ..Default::default()
        };
        let result = assert_ok!(service.pico_search(&query).await);

        assert_eq!(result.combinations.len(), 1);
        assert_eq!(result.combinations[0].count, Some(10));
    }
}
