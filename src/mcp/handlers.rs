//! Tool handlers delegating to [`PubMedService`].

use std::sync::Arc;

use serde_json::{json, Value};

use super::tools::ToolHandler;
use crate::models::{PicoQuery, SearchRequest, SortBy, MAX_RESULTS};
use crate::pubmed::PubMedError;
use crate::service::PubMedService;

fn invalid(message: impl Into<String>) -> PubMedError {
    PubMedError::InvalidInput(message.into())
}

/// Required non-empty string argument
fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, PubMedError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid(format!("Missing '{}' parameter", key)))
}

/// Optional array of strings; a missing key or `null` is an empty list
fn string_list(args: &Value, key: &str) -> Result<Vec<String>, PubMedError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(format!("'{}' must contain only strings", key)))
            })
            .collect(),
        Some(_) => Err(invalid(format!("'{}' must be an array of strings", key))),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, PubMedError> {
    serde_json::to_value(value).map_err(PubMedError::from)
}

/// Handler for keyword searches
#[derive(Debug)]
pub struct SearchPubmedHandler {
    pub service: Arc<PubMedService>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchPubmedHandler {
    async fn execute(&self, args: Value) -> Result<Value, PubMedError> {
        let keywords = string_list(&args, "keywords")?;

        let num_results = match args.get("num_results") {
            None | Some(Value::Null) => 10,
            Some(v) => v
                .as_u64()
                .ok_or_else(|| invalid("'num_results' must be a non-negative integer"))?
                .min(MAX_RESULTS as u64) as usize,
        };

        let sort_by = match args.get("sort_by").and_then(|v| v.as_str()) {
            Some(s) => s.parse::<SortBy>().map_err(invalid)?,
            None => SortBy::default(),
        };

        let mut request = SearchRequest::new(keywords)
            .num_results(num_results)
            .sort_by(sort_by);
        if let Some(journal) = args.get("journal").and_then(|v| v.as_str()) {
            request = request.journal(journal);
        }

        let response = self.service.search_pubmed(request).await?;
        to_value(&response)
    }
}

/// Handler for MeSH heading lookups
#[derive(Debug)]
pub struct GetMeshTermsHandler {
    pub service: Arc<PubMedService>,
}

#[async_trait::async_trait]
impl ToolHandler for GetMeshTermsHandler {
    async fn execute(&self, args: Value) -> Result<Value, PubMedError> {
        let search_word = required_str(&args, "search_word")?;
        let mesh_terms = self.service.get_mesh_terms(search_word).await?;

        Ok(json!({
            "search_word": search_word,
            "mesh_terms": mesh_terms,
        }))
    }
}

/// Handler for publication counts
#[derive(Debug)]
pub struct GetPubmedCountHandler {
    pub service: Arc<PubMedService>,
}

#[async_trait::async_trait]
impl ToolHandler for GetPubmedCountHandler {
    async fn execute(&self, args: Value) -> Result<Value, PubMedError> {
        let terms = string_list(&args, "search_terms")?;
        let counts = self.service.get_pubmed_count(&terms).await?;

        Ok(json!({ "counts": counts }))
    }
}

/// Handler for article details
#[derive(Debug)]
pub struct FormatPaperDetailsHandler {
    pub service: Arc<PubMedService>,
}

#[async_trait::async_trait]
impl ToolHandler for FormatPaperDetailsHandler {
    async fn execute(&self, args: Value) -> Result<Value, PubMedError> {
        let ids = string_list(&args, "pubmed_ids")?;
        let details = self.service.format_paper_details(&ids).await?;
        to_value(&details)
    }
}

/// Handler for PICO searches
#[derive(Debug)]
pub struct PicoSearchHandler {
    pub service: Arc<PubMedService>,
}

#[async_trait::async_trait]
impl ToolHandler for PicoSearchHandler {
    async fn execute(&self, args: Value) -> Result<Value, PubMedError> {
        let query = PicoQuery {
            p_terms: string_list(&args, "p_terms")?,
            i_terms: string_list(&args, "i_terms")?,
            c_terms: string_list(&args, "c_terms")?,
            o_terms: string_list(&args, "o_terms")?,
        };

        let result = self.service.pico_search(&query).await?;
        to_value(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubmed::mock::make_article;
    use crate::pubmed::MockEUtils;

    fn service_with(mock: &Arc<MockEUtils>) -> Arc<PubMedService> {
        Arc::new(PubMedService::new(mock.clone(), 2))
    }

    #[test]
    fn test_string_list() {
        let args = json!({"a": ["x", "y"], "b": null, "c": "x", "d": [1]});
        assert_eq!(string_list(&args, "a").unwrap(), vec!["x", "y"]);
        assert!(string_list(&args, "b").unwrap().is_empty());
        assert!(string_list(&args, "missing").unwrap().is_empty());
        assert!(string_list(&args, "c").is_err());
        assert!(string_list(&args, "d").is_err());
    }

    #[tokio::test]
    async fn test_search_handler_parses_arguments() {
        let mock = Arc::new(MockEUtils::new());
        mock.set_search_page("(stroke) AND \"Lancet\"[Journal]", 2, &["2", "1"]);
        mock.add_article(make_article("1", "One"));
        let handler = SearchPubmedHandler {
            service: service_with(&mock),
        };

        let value = handler
            .execute(json!({
                "keywords": ["stroke"],
                "journal": "Lancet",
                "num_results": 5,
                "sort_by": "date_asc"
            }))
            .await
            .unwrap();

        assert_eq!(value["pubmed_ids"], json!(["1", "2"]));
        assert_eq!(value["results"][0]["status"], "found");
        assert_eq!(value["results"][1]["status"], "not_found");
    }

    #[tokio::test]
    async fn test_search_handler_rejects_unknown_sort() {
        let mock = Arc::new(MockEUtils::new());
        let handler = SearchPubmedHandler {
            service: service_with(&mock),
        };

        let err = handler
            .execute(json!({"keywords": ["x"], "sort_by": "citations"}))
            .await
            .unwrap_err();
        assert!(matches!(err, PubMedError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_mesh_handler_requires_search_word() {
        let mock = Arc::new(MockEUtils::new());
        let handler = GetMeshTermsHandler {
            service: service_with(&mock),
        };

        let err = handler.execute(json!({})).await.unwrap_err();
        assert_eq!(err.kind(), "InvalidInputError");
    }

    #[tokio::test]
    async fn test_count_handler() {
        let mock = Arc::new(MockEUtils::new());
        mock.set_count("aspirin", 70_000);
        let handler = GetPubmedCountHandler {
            service: service_with(&mock),
        };

        let value = handler
            .execute(json!({"search_terms": ["aspirin", "aspirin"]}))
            .await
            .unwrap();

        assert_eq!(value["counts"][0], json!({"term": "aspirin", "count": 70000}));
        assert_eq!(value["counts"][1], value["counts"][0]);
    }

    #[tokio::test]
    async fn test_pico_handler() {
        let mock = Arc::new(MockEUtils::new());
        mock.set_count("(adults)", 9);
        let handler = PicoSearchHandler {
            service: service_with(&mock),
        };

        let value = handler
            .execute(json!({"p_terms": ["adults"], "i_terms": ["aspirin"]}))
            .await
            .unwrap();

        assert_eq!(value["combinations"][0]["label"], "P");
        assert_eq!(value["combinations"][0]["count"], 9);
        assert_eq!(value["combinations"][1]["query"], "(adults) AND (aspirin)");
    }
}
