use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use pubmed_enhanced::config::{find_config_file, get_config, load_config, Config};
use pubmed_enhanced::mcp::McpServer;
use pubmed_enhanced::models::{PicoQuery, SearchRequest, SortBy};
use pubmed_enhanced::service::PubMedService;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// PubMed Enhanced - PubMed search, MeSH lookup, publication counts and PICO combinations over MCP
#[derive(Parser, Debug)]
#[command(name = "pubmed-enhanced")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server and CLI for NCBI PubMed E-utilities", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Result ordering for searches
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortArg {
    /// Best match first
    Relevance,
    /// Newest first
    DateDesc,
    /// Oldest first
    DateAsc,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Relevance => SortBy::Relevance,
            SortArg::DateDesc => SortBy::DateDesc,
            SortArg::DateAsc => SortBy::DateAsc,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (default)
    Serve {
        /// Run in stdio mode (the default transport)
        #[arg(long)]
        stdio: bool,

        /// Run in streamable HTTP mode
        #[arg(long, conflicts_with = "stdio")]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Search PubMed; all keywords must match
    #[command(alias = "s")]
    Search {
        /// Keywords
        #[arg(required = true)]
        keywords: Vec<String>,

        /// Restrict to a journal title
        #[arg(long, short)]
        journal: Option<String>,

        /// Maximum number of results
        #[arg(long, short = 'n', default_value_t = 10)]
        num_results: usize,

        /// Result ordering
        #[arg(long, value_enum, default_value_t = SortArg::Relevance)]
        sort_by: SortArg,
    },

    /// Look up MeSH headings for a word or phrase
    Mesh {
        /// Word or phrase
        term: String,
    },

    /// Count publications for each search term
    Count {
        /// PubMed query strings
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Show article details for PubMed IDs
    Details {
        /// PubMed IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Count publications for PICO elements and their combinations
    Pico {
        /// Population term (repeat for synonyms)
        #[arg(short = 'p', long = "population", required = true)]
        p_terms: Vec<String>,

        /// Intervention term (repeat for synonyms)
        #[arg(short = 'i', long = "intervention")]
        i_terms: Vec<String>,

        /// Comparison term (repeat for synonyms)
        #[arg(short = 'c', long = "comparison")]
        c_terms: Vec<String>,

        /// Outcome term (repeat for synonyms)
        #[arg(short = 'o', long = "outcome")]
        o_terms: Vec<String>,
    },
}

fn load_settings(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        load_config(config_path)?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)?
    } else {
        get_config()?
    };

    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout;
    }

    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    // stdout carries the stdio transport and JSON output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("pubmed_enhanced={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_settings(&cli)?;
    if config.ncbi.email.is_none() {
        tracing::debug!("No contact e-mail configured; set NCBI_EMAIL to identify requests");
    }

    let service = PubMedService::from_config(&config)?;

    match cli.command {
        None => {
            let server = McpServer::new(Arc::new(service))?;
            server.run().await?;
        }

        Some(Commands::Serve {
            stdio: _,
            http,
            port,
            host,
        }) => {
            let server = McpServer::new(Arc::new(service))?;

            if http {
                let addr = format!("{}:{}", host, port);
                let (bound_addr, handle) = server.run_http(&addr).await?;
                tracing::info!("MCP server listening on {}", bound_addr);

                handle
                    .await
                    .map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
            } else {
                server.run().await?;
            }
        }

        Some(Commands::Search {
            keywords,
            journal,
            num_results,
            sort_by,
        }) => {
            let mut request = SearchRequest::new(keywords)
                .num_results(num_results)
                .sort_by(sort_by.into());
            if let Some(journal) = journal {
                request = request.journal(journal);
            }
            print_json(&service.search_pubmed(request).await?)?;
        }

        Some(Commands::Mesh { term }) => {
            let mesh_terms = service.get_mesh_terms(&term).await?;
            print_json(&serde_json::json!({
                "search_word": term,
                "mesh_terms": mesh_terms,
            }))?;
        }

        Some(Commands::Count { terms }) => {
            print_json(&service.get_pubmed_count(&terms).await?)?;
        }

        Some(Commands::Details { ids }) => {
            print_json(&service.format_paper_details(&ids).await?)?;
        }

        Some(Commands::Pico {
            p_terms,
            i_terms,
            c_terms,
            o_terms,
        }) => {
            let query = PicoQuery {
                p_terms,
                i_terms,
                c_terms,
                o_terms,
            };
            print_json(&service.pico_search(&query).await?)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["pubmed-enhanced"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.timeout, None);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["pubmed-enhanced", "-vv"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["pubmed-enhanced", "--quiet"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_timeout_and_config() {
        let cli = Cli::parse_from([
            "pubmed-enhanced",
            "--timeout",
            "60",
            "--config",
            "/path/to/config.toml",
        ]);
        assert_eq!(cli.timeout, Some(60));
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::parse_from(["pubmed-enhanced", "serve"]);
        match &cli.command {
            Some(Commands::Serve {
                http, port, host, ..
            }) => {
                assert!(!*http);
                assert_eq!(*port, 3000);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("Expected Serve command"),
        }

        let cli = Cli::parse_from(["pubmed-enhanced", "serve", "--http", "-p", "8080"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Serve {
                http: true,
                port: 8080,
                ..
            })
        ));
    }

    #[test]
    fn test_cli_search_command() {
        let cli = Cli::parse_from([
            "pubmed-enhanced",
            "search",
            "asthma",
            "children",
            "--journal",
            "Pediatrics",
            "-n",
            "5",
            "--sort-by",
            "date-asc",
        ]);
        match cli.command {
            Some(Commands::Search {
                keywords,
                journal,
                num_results,
                sort_by,
            }) => {
                assert_eq!(keywords, vec!["asthma", "children"]);
                assert_eq!(journal.as_deref(), Some("Pediatrics"));
                assert_eq!(num_results, 5);
                assert_eq!(SortBy::from(sort_by), SortBy::DateAsc);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_pico_command() {
        let cli = Cli::parse_from([
            "pubmed-enhanced",
            "pico",
            "-p",
            "adults",
            "-p",
            "elderly",
            "-i",
            "aspirin",
        ]);
        match cli.command {
            Some(Commands::Pico {
                p_terms,
                i_terms,
                c_terms,
                o_terms,
            }) => {
                assert_eq!(p_terms, vec!["adults", "elderly"]);
                assert_eq!(i_terms, vec!["aspirin"]);
                assert!(c_terms.is_empty());
                assert!(o_terms.is_empty());
            }
            _ => panic!("Expected Pico command"),
        }
    }

    #[test]
    fn test_cli_pico_requires_population() {
        assert!(Cli::try_parse_from(["pubmed-enhanced", "pico", "-i", "aspirin"]).is_err());
    }
}
