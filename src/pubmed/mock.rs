//! In-memory E-utilities for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::{Article, ArticleBuilder, IdPage, SortBy};
use crate::pubmed::{EUtilsApi, PubMedError};

#[derive(Debug, Default)]
struct MockState {
    counts: HashMap<String, Result<u64, PubMedError>>,
    pages: HashMap<String, Result<IdPage, PubMedError>>,
    mesh: HashMap<String, Vec<String>>,
    articles: HashMap<String, Article>,
    fetch_error: Option<PubMedError>,
    calls: Vec<String>,
}

/// A scriptable [`EUtilsApi`] that answers from predefined responses.
///
/// Unknown count queries return 0, unknown searches an empty page, unknown
/// MeSH terms no headings. Every call is recorded as `"<op>:<argument>"`.
#[derive(Debug, Default)]
pub struct MockEUtils {
    state: Mutex<MockState>,
}

impl MockEUtils {
    /// Create a new mock.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the count returned for an exact query string.
    pub fn set_count(&self, term: &str, count: u64) {
        self.state().counts.insert(term.to_string(), Ok(count));
    }

    /// Make the count for an exact query string fail.
    pub fn set_count_error(&self, term: &str, error: PubMedError) {
        self.state().counts.insert(term.to_string(), Err(error));
    }

    /// Set the identifier page returned for an exact query string.
    pub fn set_search_page(&self, term: &str, total: u64, ids: &[&str]) {
        let page = IdPage {
            total,
            ids: ids.iter().map(|id| id.to_string()).collect(),
        };
        self.state().pages.insert(term.to_string(), Ok(page));
    }

    /// Make the search for an exact query string fail.
    pub fn set_search_error(&self, term: &str, error: PubMedError) {
        self.state().pages.insert(term.to_string(), Err(error));
    }

    /// Set the MeSH headings returned for a term.
    pub fn set_mesh_headings(&self, term: &str, headings: &[&str]) {
        self.state().mesh.insert(
            term.to_string(),
            headings.iter().map(|h| h.to_string()).collect(),
        );
    }

    /// Register an article that `fetch_articles` can return.
    pub fn add_article(&self, article: Article) {
        self.state()
            .articles
            .insert(article.pubmed_id.clone(), article);
    }

    /// Make every `fetch_articles` call fail.
    pub fn set_fetch_error(&self, error: PubMedError) {
        self.state().fetch_error = Some(error);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of `count` calls made for an exact query string.
    pub fn count_calls(&self, term: &str) -> usize {
        let needle = format!("count:{}", term);
        self.state().calls.iter().filter(|c| **c == needle).count()
    }
}

#[async_trait]
impl EUtilsApi for MockEUtils {
    async fn count(&self, term: &str) -> Result<u64, PubMedError> {
        let mut state = self.state();
        state.calls.push(format!("count:{}", term));
        state.counts.get(term).cloned().unwrap_or(Ok(0))
    }

    async fn search_ids(
        &self,
        term: &str,
        retmax: usize,
        _sort: SortBy,
    ) -> Result<IdPage, PubMedError> {
        let mut state = self.state();
        state.calls.push(format!("search:{}", term));
        let mut page = state.pages.get(term).cloned().unwrap_or(Ok(IdPage {
            total: 0,
            ids: Vec::new(),
        }))?;
        page.ids.truncate(retmax);
        Ok(page)
    }

    async fn mesh_headings(&self, term: &str) -> Result<Vec<String>, PubMedError> {
        let mut state = self.state();
        state.calls.push(format!("mesh:{}", term));
        Ok(state.mesh.get(term).cloned().unwrap_or_default())
    }

    async fn fetch_articles(&self, pmids: &[String]) -> Result<Vec<Article>, PubMedError> {
        let mut state = self.state();
        state.calls.push(format!("fetch:{}", pmids.join(",")));
        if let Some(error) = &state.fetch_error {
            return Err(error.clone());
        }
        Ok(pmids
            .iter()
            .filter_map(|id| state.articles.get(id).cloned())
            .collect())
    }
}

/// Helper function to create a minimal article for testing.
pub fn make_article(pmid: &str, title: &str) -> Article {
    ArticleBuilder::new(pmid, title)
        .journal(Some("Test Journal".to_string()))
        .build()
}
