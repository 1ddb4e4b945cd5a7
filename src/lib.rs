//! # PubMed Enhanced
//!
//! A Model Context Protocol (MCP) server for NCBI PubMed: keyword search,
//! MeSH lookup, publication counts, article details and PICO query
//! combinations for evidence-based-medicine literature scoping.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Article, SearchRequest, PicoQuery, etc.)
//! - [`pubmed`]: E-utilities client, response parsing and the [`pubmed::EUtilsApi`] seam
//! - [`pico`]: PICO query expansion and count resolution
//! - [`service`]: The five operations exposed as tools
//! - [`mcp`]: MCP protocol implementation and server
//! - [`utils`]: HTTP client, retry with exponential backoff
//! - [`config`]: Configuration management

pub mod config;
pub mod mcp;
pub mod models;
pub mod pico;
pub mod pubmed;
pub mod service;
pub mod utils;

// Re-export commonly used types
pub use models::{Article, PaperDetails, PicoQuery, SearchRequest};
pub use pubmed::{EUtilsApi, PubMedClient, PubMedError};
pub use service::PubMedService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
