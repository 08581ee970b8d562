//! Subcommand handlers

use anyhow::Result;
use bookstore_catalog::{Catalog, CatalogStore};
use bookstore_common::config::StoreConfig;

/// Seed the catalog and report the record count
pub async fn handle_seed(catalog: &Catalog) -> Result<()> {
    let report = catalog.seed().await?;
    println!(
        "Inserted {} books; the catalog now holds {}",
        report.inserted, report.total
    );
    Ok(())
}

/// Round-trip a ping to the store
pub async fn handle_ping(store: &dyn CatalogStore, config: &StoreConfig) -> Result<()> {
    store.ping().await?;
    println!(
        "Connected to {} at {} (database {}, collection {})",
        store.backend(),
        config.uri,
        config.database,
        config.collection
    );
    Ok(())
}
