//! Configuration for codenav

use crate::CodenavError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration as TOML
pub const DEFAULT_CONFIG: &str = r#"# Codenav Configuration

[request]
# Maximum number of upload ids passed to a single moniker search
maximum_indexes_per_moniker_search = 500
# Number of diffs retained per request for position translation
hunk_cache_size = 1000

[authz]
# Paths hidden from navigation results (glob patterns)
deny = []
"#;

/// Codenav configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub authz: AuthzConfig,
}

/// Bounds applied to every request's state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_maximum_indexes_per_moniker_search")]
    pub maximum_indexes_per_moniker_search: usize,
    #[serde(default = "default_hunk_cache_size")]
    pub hunk_cache_size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthzConfig {
    #[serde(default)]
    pub deny: Vec<String>,
}

// Default value functions
fn default_maximum_indexes_per_moniker_search() -> usize {
    500
}
fn default_hunk_cache_size() -> usize {
    1000
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            maximum_indexes_per_moniker_search: default_maximum_indexes_per_moniker_search(),
            hunk_cache_size: default_hunk_cache_size(),
        }
    }
}

impl RequestConfig {
    /// Reject bounds a request cannot be built with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.maximum_indexes_per_moniker_search == 0 {
            return Err(CodenavError::Configuration(
                "maximum_indexes_per_moniker_search must be positive".to_string(),
            ));
        }
        if self.hunk_cache_size == 0 {
            return Err(CodenavError::Configuration(
                "hunk_cache_size must be positive".to_string(),
            ));
        }
        Ok(())
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
        toml::from_str(content).map_err(|e| CodenavError::ConfigParse(e.to_string()))
    }
}
