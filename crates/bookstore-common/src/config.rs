//! Configuration management for the bookstore catalog

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Store connection configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML/JSON file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse(path.as_ref(), &content)
    }

    /// Load configuration from `path`, falling back to defaults when the file is absent
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path).await
        } else {
            tracing::debug!(path = %path.as_ref().display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let config: Config = if path.extension().map_or(false, |ext| ext == "toml") {
            toml::from_str(content)
                .map_err(|e| Error::Config(format!("Failed to parse TOML config: {}", e)))?
        } else {
            serde_json::from_str(content)
                .map_err(|e| Error::Config(format!("Failed to parse JSON config: {}", e)))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that can never open a collection
    pub fn validate(&self) -> Result<()> {
        if self.store.database.is_empty() {
            return Err(Error::Config("store.database must not be empty".to_string()));
        }
        if self.store.collection.is_empty() {
            return Err(Error::Config("store.collection must not be empty".to_string()));
        }
        if self.store.backend == Backend::MongoDb && !self.store.uri.starts_with("mongodb") {
            return Err(Error::Config(format!(
                "store.uri must be a mongodb:// or mongodb+srv:// URI, got {}",
                self.store.uri
            )));
        }
        Ok(())
    }
}

/// Which store implementation backs the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A MongoDB server reached through the official driver
    #[default]
    #[serde(rename = "mongodb")]
    MongoDb,
    /// In-process store, nothing survives the run
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::MongoDb => write!(f, "mongodb"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Backend::MongoDb),
            "memory" | "mem" => Ok(Backend::Memory),
            other => Err(Error::Config(format!("Unknown store backend: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store implementation
    pub backend: Backend,
    /// Connection string
    pub uri: String,
    /// Database name
    pub database: String,
    /// Collection holding the book records
    pub collection: String,
    /// Application name reported to the server
    pub app_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::MongoDb,
            uri: "mongodb://127.0.0.1:27017".to_string(),
            database: "plp_bookstore".to_string(),
            collection: "books".to_string(),
            app_name: "plp-bookstore".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default directive when RUST_LOG is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}
