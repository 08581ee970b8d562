//! Full-replace seeding of the catalog

use tracing::{error, info};

use bookstore_common::{Error, Result, SeedReport};

use crate::catalog::Catalog;
use crate::dataset::seed_books;

impl Catalog {
    /// Replace the whole catalog with the seed dataset
    ///
    /// Clears the collection, bulk-inserts the twelve books and counts the
    /// result. Any store failure aborts the call; nothing is retried.
    pub async fn seed(&self) -> Result<SeedReport> {
        let docs = seed_books()
            .iter()
            .map(bson::to_document)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let store = self.store();
        let result = async {
            let removed = store.clear().await?;
            let inserted = store.insert_many(docs).await?;
            let total = store.count(bson::Document::new()).await?;
            Ok::<_, Error>((removed, inserted, total))
        }
        .await;

        match result {
            Ok((removed, inserted, total)) => {
                info!(removed, inserted, total, "Seeded book catalog");
                Ok(SeedReport { inserted, total })
            }
            Err(e) => {
                error!(error = %e, "Seeding the book catalog failed");
                Err(e)
            }
        }
    }
}
