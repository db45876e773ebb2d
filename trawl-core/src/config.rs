//! Configuration for trawl

use crate::scroll::DEFAULT_LEASE;
use crate::TrawlError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration as TOML
pub const DEFAULT_CONFIG: &str = r#"# Trawl Configuration

[engine]
# Base URL of the search engine
url = "http://127.0.0.1:9200"
# Upper bound for a single request/response round-trip (e.g., "10s", "500ms")
request_timeout = "10s"

[scroll]
# Documents requested per page
page_size = 20
# How long the server keeps a scroll context alive between rounds
lease = "1m"
"#;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Trawl configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_lease")]
    pub lease: String,
}

// Default value functions
fn default_url() -> String {
    "http://127.0.0.1:9200".to_string()
}
fn default_request_timeout() -> String {
    "10s".to_string()
}
fn default_page_size() -> usize {
    crate::query::DEFAULT_PAGE_SIZE
}
fn default_lease() -> String {
    "1m".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            lease: default_lease(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| TrawlError::ConfigParse(e.to_string()))
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        parse_duration(&self.engine.request_timeout).unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Get scroll lease as Duration
    pub fn lease(&self) -> Duration {
        parse_duration(&self.scroll.lease).unwrap_or(DEFAULT_LEASE)
    }
}

/// Parse duration string (e.g., "500ms", "10s", "1m", "1h")
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(num_str) = s.strip_suffix("ms") {
        return num_str.parse().ok().map(Duration::from_millis);
    }

    let unit_len = s.chars().last()?.len_utf8();
    let (num_str, unit) = s.split_at(s.len() - unit_len);
    let num: u64 = num_str.parse().ok()?;

    match unit {
        "s" => Some(Duration::from_secs(num)),
        "m" => num.checked_mul(60).map(Duration::from_secs),
        "h" => num.checked_mul(3600).map(Duration::from_secs),
        "d" => num.checked_mul(86400).map(Duration::from_secs),
        _ => None,
    }
}
