//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::handlers::{
    FormatPaperDetailsHandler, GetMeshTermsHandler, GetPubmedCountHandler, PicoSearchHandler,
    SearchPubmedHandler,
};
use crate::pubmed::PubMedError;
use crate::service::PubMedService;

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "search_pubmed")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: serde_json::Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, PubMedError>;
}

/// Registry for all MCP tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry with the five PubMed tools
    pub fn from_service(service: Arc<PubMedService>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Tool {
            name: "search_pubmed".to_string(),
            description: "Search PubMed for articles matching all keywords, optionally within one journal. Returns ranked PubMed IDs, the total match count and article details.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "keywords": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Keywords, all of which must match (AND)"
                    },
                    "journal": {
                        "type": "string",
                        "description": "Restrict to this journal title"
                    },
                    "num_results": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": 10,
                        "minimum": 1,
                        "maximum": 10000
                    },
                    "sort_by": {
                        "type": "string",
                        "description": "Result ordering",
                        "enum": ["relevance", "date_desc", "date_asc"],
                        "default": "relevance"
                    }
                },
                "required": ["keywords"]
            }),
            handler: Arc::new(SearchPubmedHandler {
                service: service.clone(),
            }),
        });

        registry.register(Tool {
            name: "get_mesh_terms".to_string(),
            description: "Look up MeSH (Medical Subject Headings) matching a word or phrase.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "search_word": {
                        "type": "string",
                        "description": "Word or phrase to look up in the MeSH database"
                    }
                },
                "required": ["search_word"]
            }),
            handler: Arc::new(GetMeshTermsHandler {
                service: service.clone(),
            }),
        });

        registry.register(Tool {
            name: "get_pubmed_count".to_string(),
            description: "Get the number of PubMed publications matching each search term.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "search_terms": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "PubMed query strings to count"
                    }
                },
                "required": ["search_terms"]
            }),
            handler: Arc::new(GetPubmedCountHandler {
                service: service.clone(),
            }),
        });

        registry.register(Tool {
            name: "format_paper_details".to_string(),
            description: "Fetch title, authors, journal, abstract, DOI and MeSH keywords for PubMed IDs. Unknown IDs are reported as not_found.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "pubmed_ids": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "PubMed IDs (PMIDs)"
                    }
                },
                "required": ["pubmed_ids"]
            }),
            handler: Arc::new(FormatPaperDetailsHandler {
                service: service.clone(),
            }),
        });

        registry.register(Tool {
            name: "pico_search".to_string(),
            description: "Count publications for each PICO element and for the cumulative AND combinations P, P AND I, P AND I AND C, P AND I AND C AND O. Synonyms within an element are OR-joined.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "p_terms": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Population synonyms (required, at least one)"
                    },
                    "i_terms": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Intervention synonyms"
                    },
                    "c_terms": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Comparison synonyms"
                    },
                    "o_terms": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Outcome synonyms"
                    }
                },
                "required": ["p_terms"]
            }),
            handler: Arc::new(PicoSearchHandler { service }),
        });

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, PubMedError> {
        let tool = self
            .get(name)
            .ok_or_else(|| PubMedError::InvalidInput(format!("Tool '{}' not found", name)))?;

        tool.handler.execute(args).await
    }
}
