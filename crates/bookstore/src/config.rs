//! Configuration loading

use std::path::Path;

use anyhow::Result;
use bookstore_common::config::{Backend, Config};

/// Load configuration from file, then apply command-line and environment overrides
pub async fn load(path: &str, uri: Option<&str>, backend: Option<Backend>) -> Result<Config> {
    let mut config = Config::load_or_default(Path::new(path))
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    if let Some(uri) = uri {
        config.store.uri = uri.to_string();
    }
    if let Some(backend) = backend {
        config.store.backend = backend;
    }

    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config)
}
