//! Configuration types for modelmeta
//!
//! Every section is optional in the TOML file; missing values fall back to
//! the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MetaConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MetaConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load the file at `path`, falling back to defaults
    ///
    /// A missing file is silently replaced by defaults; an unreadable or
    /// unparsable one is reported on stderr and replaced by defaults. This
    /// runs before the tracing subscriber is installed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) => {
                eprintln!("Warning: Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }
}

/// Metadata registry sizing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum entries per registry before LRU eviction
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// Metadata fetch planning
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Operations per composite request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Composite requests in flight at once
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
    /// `recursive-depth` sent for recursive requests
    #[serde(default = "default_recursive_depth")]
    pub recursive_depth: u32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
            recursive_depth: default_recursive_depth(),
        }
    }
}

/// Management endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL, `/management` is appended
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Model tree traversal defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Address prefixes never visited
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_capacity() -> usize {
    500
}

const fn default_batch_size() -> usize {
    3
}

const fn default_max_concurrent_batches() -> usize {
    8
}

const fn default_recursive_depth() -> u32 {
    2
}

fn default_endpoint() -> String {
    "http://localhost:9990".to_string()
}

const fn default_timeout_ms() -> u64 {
    30_000
}

fn default_exclude() -> Vec<String> {
    vec!["/core-service=platform-mbean".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetaConfig::default();
        assert_eq!(config.registry.capacity, 500);
        assert_eq!(config.processor.batch_size, 3);
        assert_eq!(config.client.endpoint, "http://localhost:9990");
        assert_eq!(config.traversal.exclude, vec!["/core-service=platform-mbean"]);
    }

    #[test]
    fn test_partial_toml() {
        let config = MetaConfig::from_toml_str(
            r#"
            [processor]
            batch_size = 5

            [client]
            endpoint = "http://dc.example.com:9990"
            "#,
        )
        .unwrap();
        assert_eq!(config.processor.batch_size, 5);
        assert_eq!(config.processor.max_concurrent_batches, 8);
        assert_eq!(config.client.endpoint, "http://dc.example.com:9990");
        assert_eq!(config.client.timeout_ms, 30_000);
        assert_eq!(config.registry.capacity, 500);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = MetaConfig::load_or_default("/nonexistent/modelmeta.toml");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(MetaConfig::from_toml_str("[processor\nbatch_size = ").is_err());
    }
}
