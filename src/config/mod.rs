//! Configuration management.
//!
//! Settings come from an optional TOML file, then from environment variables
//! with the `PUBMED_ENHANCED` prefix and `__` as section separator, e.g.
//! `PUBMED_ENHANCED__RETRY__MAX_ATTEMPTS=5`.
//!
//! ```toml
//! [ncbi]
//! base_url = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils"
//! api_key = "your-ncbi-api-key"
//! email = "you@example.org"
//! tool = "pubmed-enhanced"
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 1000
//! max_delay_ms = 30000
//!
//! [rate_limits]
//! requests_per_second = 3
//! max_concurrent_requests = 3
//!
//! [http]
//! timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::RetryConfig;

/// Default E-utilities endpoint
pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// NCBI allows 3 requests/second without an API key
pub const ANONYMOUS_REQUESTS_PER_SECOND: u32 = 3;

/// NCBI allows 10 requests/second with an API key
pub const API_KEY_REQUESTS_PER_SECOND: u32 = 10;

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "pubmed-enhanced.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream endpoint and usage-policy identity
    #[serde(default)]
    pub ncbi: NcbiConfig,

    /// Retry/backoff settings
    #[serde(default)]
    pub retry: RetrySettings,

    /// Rate limiting settings
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// NCBI E-utilities settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NcbiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (optional, raises the rate limit to 10 requests/second)
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    /// Contact e-mail sent with every request, as NCBI asks
    #[serde(default = "default_email")]
    pub email: Option<String>,

    /// Tool name sent with every request
    #[serde(default = "default_tool")]
    pub tool: String,
}

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            email: default_email(),
            tool: default_tool(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key() -> Option<String> {
    std::env::var("NCBI_API_KEY").ok().filter(|k| !k.is_empty())
}

fn default_email() -> Option<String> {
    std::env::var("NCBI_EMAIL").ok().filter(|e| !e.is_empty())
}

fn default_tool() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

/// Retry settings as they appear in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second; unset picks the NCBI quota, 0 disables limiting
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Maximum in-flight requests for batched operations
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: None,
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    3
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Effective request rate: explicit setting, else the NCBI quota for the key status
    pub fn requests_per_second(&self) -> u32 {
        match self.rate_limits.requests_per_second {
            Some(rps) => rps,
            None if self.ncbi.api_key.is_some() => API_KEY_REQUESTS_PER_SECOND,
            None => ANONYMOUS_REQUESTS_PER_SECOND,
        }
    }

    /// Concurrency bound for batched fetches (at least 1)
    pub fn max_concurrent_requests(&self) -> usize {
        self.rate_limits.max_concurrent_requests.max(1)
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.to_retry_config()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("PUBMED_ENHANCED").separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Load configuration from environment overrides and defaults only
pub fn get_config() -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix("PUBMED_ENHANCED").separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Find a config file in the working directory or the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ncbi.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.ncbi.tool, "pubmed-enhanced");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.max_concurrent_requests(), 3);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_requests_per_second_follows_api_key() {
        let mut config = Config::default();
        config.ncbi.api_key = None;
        assert_eq!(config.requests_per_second(), ANONYMOUS_REQUESTS_PER_SECOND);

        config.ncbi.api_key = Some("key".to_string());
        assert_eq!(config.requests_per_second(), API_KEY_REQUESTS_PER_SECOND);

        config.rate_limits.requests_per_second = Some(0);
        assert_eq!(config.requests_per_second(), 0);
    }

    #[test]
    fn test_retry_config_conversion() {
        let settings = RetrySettings {
            max_attempts: 5,
            base_delay_ms: 250,
            max_delay_ms: 2000,
        };
        let retry = settings.to_retry_config();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.base_delay, Duration::from_millis(250));
        assert_eq!(retry.max_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let toml_content = r#"
[ncbi]
base_url = "http://localhost:9999/eutils"
api_key = "test-key"
email = "researcher@example.org"

[retry]
max_attempts = 4
base_delay_ms = 500

[rate_limits]
requests_per_second = 5
max_concurrent_requests = 2

[http]
timeout_secs = 10
"#;

        let mut file = File::create(&path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.ncbi.base_url, "http://localhost:9999/eutils");
        assert_eq!(config.ncbi.api_key, Some("test-key".to_string()));
        assert_eq!(config.ncbi.email, Some("researcher@example.org".to_string()));
        assert_eq!(config.ncbi.tool, "pubmed-enhanced");
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.retry.max_delay_ms, 30_000);
        assert_eq!(config.requests_per_second(), 5);
        assert_eq!(config.max_concurrent_requests(), 2);
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_config_nonexistent() {
        let result = load_config(Path::new("/nonexistent/pubmed-enhanced.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(load_config(&path).is_err());
    }
}
