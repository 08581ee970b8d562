//! Index creation and query cost reporting

use bson::{doc, Document};
use tracing::{error, info};

use bookstore_common::{QueryCost, Result};

use crate::catalog::Catalog;

/// Keys of the indexes the catalog maintains
pub fn catalog_index_keys() -> Vec<Document> {
    vec![
        doc! { "title": 1 },
        doc! { "author": 1, "published_year": -1 },
    ]
}

/// Queries explained by the performance demonstration
fn representative_queries() -> Vec<(&'static str, Document)> {
    vec![
        ("genre (no index)", doc! { "genre": "Fiction" }),
        ("title (title index)", doc! { "title": "The Great Gatsby" }),
        (
            "author and year (compound index)",
            doc! { "author": "J.K. Rowling", "published_year": { "$gt": 1990 } },
        ),
    ]
}

impl Catalog {
    /// Create the title index and the author/year compound index
    ///
    /// Returns the created index names. Creating an index that already
    /// exists is a no-op on every backend.
    pub async fn create_indexes(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for keys in catalog_index_keys() {
            let name = self
                .store()
                .create_index(keys)
                .await
                .inspect_err(|e| error!(error = %e, "index creation failed"))?;
            info!(index = %name, "Created index");
            names.push(name);
        }
        Ok(names)
    }

    /// Names of every index on the collection
    pub async fn list_indexes(&self) -> Result<Vec<String>> {
        self.store()
            .list_indexes()
            .await
            .inspect_err(|e| error!(error = %e, "listing indexes failed"))
    }

    /// Explain a few representative queries and report their cost
    pub async fn demonstrate_index_performance(&self) -> Result<Vec<QueryCost>> {
        let mut costs = Vec::new();
        for (label, filter) in representative_queries() {
            let stats = self
                .store()
                .explain(filter)
                .await
                .inspect_err(|e| error!(query = label, error = %e, "explain failed"))?;
            costs.push(QueryCost {
                label: label.to_string(),
                docs_examined: stats.docs_examined,
                keys_examined: stats.keys_examined,
                returned: stats.returned,
                execution_time_ms: stats.execution_time_ms,
                index_used: stats.index_used,
            });
        }
        Ok(costs)
    }
}
