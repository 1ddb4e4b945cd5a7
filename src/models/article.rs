//! Bibliographic record model for PubMed articles.

use serde::{Deserialize, Serialize};

/// Maximum number of MeSH keywords kept per article
pub const MAX_KEYWORDS: usize = 10;

/// A PubMed article with the bibliographic fields returned by `efetch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// PubMed identifier
    pub pubmed_id: String,

    /// Article page on pubmed.ncbi.nlm.nih.gov
    pub link: String,

    /// Article title
    pub title: String,

    /// Authors as "LastName ForeName" (or initials, or collective name)
    pub authors: Vec<String>,

    /// Journal title
    pub journal: Option<String>,

    /// Journal volume
    pub volume: Option<String>,

    /// Journal issue
    pub issue: Option<String>,

    /// Page range (MedlinePgn)
    pub pages: Option<String>,

    /// Digital Object Identifier
    pub doi: Option<String>,

    /// Publication date as "Year-Month-Day", or the free-form MedlineDate
    pub pubdate: Option<String>,

    /// Abstract text; labelled sections are rendered "LABEL: text"
    pub r#abstract: Option<String>,

    /// MeSH descriptor names, at most [`MAX_KEYWORDS`]
    pub keywords: Vec<String>,
}

impl Article {
    /// Canonical PubMed URL for an identifier
    pub fn link_for(pubmed_id: &str) -> String {
        format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pubmed_id)
    }
}

/// Builder for [`Article`]
#[derive(Debug, Clone)]
pub struct ArticleBuilder {
    article: Article,
}

impl ArticleBuilder {
    /// Start a builder for the given PMID and title
    pub fn new(pubmed_id: impl Into<String>, title: impl Into<String>) -> Self {
        let pubmed_id = pubmed_id.into();
        Self {
            article: Article {
                link: Article::link_for(&pubmed_id),
                pubmed_id,
                title: title.into(),
                authors: Vec::new(),
                journal: None,
                volume: None,
                issue: None,
                pages: None,
                doi: None,
                pubdate: None,
                r#abstract: None,
                keywords: Vec::new(),
            },
        }
    }

    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.article.authors = authors;
        self
    }

    pub fn journal(mut self, journal: Option<String>) -> Self {
        self.article.journal = journal;
        self
    }

    pub fn volume(mut self, volume: Option<String>) -> Self {
        self.article.volume = volume;
        self
    }

    pub fn issue(mut self, issue: Option<String>) -> Self {
        self.article.issue = issue;
        self
    }

    pub fn pages(mut self, pages: Option<String>) -> Self {
        self.article.pages = pages;
        self
    }

    pub fn doi(mut self, doi: Option<String>) -> Self {
        self.article.doi = doi;
        self
    }

    pub fn pubdate(mut self, pubdate: Option<String>) -> Self {
        self.article.pubdate = pubdate;
        self
    }

    pub fn abstract_text(mut self, text: Option<String>) -> Self {
        self.article.r#abstract = text;
        self
    }

    /// Set MeSH keywords, truncated to [`MAX_KEYWORDS`]
    pub fn keywords(mut self, mut keywords: Vec<String>) -> Self {
        keywords.truncate(MAX_KEYWORDS);
        self.article.keywords = keywords;
        self
    }

    pub fn build(self) -> Article {
        self.article
    }
}

/// Per-identifier outcome of a details lookup
///
/// A missing record is reported in place instead of failing the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaperDetails {
    /// The record exists
    Found {
        #[serde(flatten)]
        article: Article,
    },
    /// No record for this identifier
    NotFound { pubmed_id: String },
}

impl PaperDetails {
    /// The identifier this entry answers for
    pub fn pubmed_id(&self) -> &str {
        match self {
            PaperDetails::Found { article } => &article.pubmed_id,
            PaperDetails::NotFound { pubmed_id } => pubmed_id,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PaperDetails::Found { .. })
    }

    pub fn article(&self) -> Option<&Article> {
        match self {
            PaperDetails::Found { article } => Some(article),
            PaperDetails::NotFound { .. } => None,
        }
    }
}
