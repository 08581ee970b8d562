//! Document store abstraction
//!
//! The catalog speaks MongoDB's query language (filters, update documents
//! and aggregation pipelines as BSON). Each backend executes those
//! documents against one collection.

pub mod memory;
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};
use tracing::info;

use bookstore_common::config::{Backend, StoreConfig};
use bookstore_common::{DeleteOutcome, Result, UpdateOutcome};

/// Options for a find call, applied in the order sort, skip, limit, projection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl FindSpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Execution statistics reported by a store's query planner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplainStats {
    pub docs_examined: u64,
    pub keys_examined: u64,
    pub returned: u64,
    pub execution_time_ms: u64,
    /// Name of the index the winning plan scanned, if any
    pub index_used: Option<String>,
}

/// A single collection of documents
///
/// Implementations must be usable behind `Arc<dyn CatalogStore>`. The
/// catalog issues one call at a time.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Which backend this is
    fn backend(&self) -> Backend;

    /// Round-trip to the store to prove it is reachable
    async fn ping(&self) -> Result<()>;

    /// Remove every document, returning how many were removed
    async fn clear(&self) -> Result<u64>;

    /// Insert documents in order, returning how many were inserted
    async fn insert_many(&self, docs: Vec<Document>) -> Result<u64>;

    /// Count documents matching `filter`
    async fn count(&self, filter: Document) -> Result<u64>;

    async fn find(&self, filter: Document, spec: FindSpec) -> Result<Vec<Document>>;

    /// Apply `update` to the first document matching `filter`
    async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateOutcome>;

    /// Remove the first document matching `filter`
    async fn delete_one(&self, filter: Document) -> Result<DeleteOutcome>;

    async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>>;

    /// Create an index on `keys`, returning its name
    async fn create_index(&self, keys: Document) -> Result<String>;

    /// Names of every index on the collection, `_id_` included
    async fn list_indexes(&self) -> Result<Vec<String>>;

    /// Run `filter` through the planner and report execution statistics
    async fn explain(&self, filter: Document) -> Result<ExplainStats>;

    /// Release the connection. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// Open the store described by `config`
///
/// For MongoDB this pings the server so an unreachable store fails here
/// rather than on the first catalog call.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn CatalogStore>> {
    match config.backend {
        Backend::MongoDb => {
            let store = mongo::MongoStore::connect(config).await?;
            Ok(Arc::new(store))
        }
        Backend::Memory => {
            info!(collection = %config.collection, "Using in-memory catalog store");
            Ok(Arc::new(memory::MemoryStore::new()))
        }
    }
}

/// Name MongoDB assigns to an index on `keys`, e.g. `author_1_published_year_-1`
pub fn default_index_name(keys: &Document) -> String {
    keys.iter()
        .map(|(field, direction)| {
            let direction = match direction {
                Bson::Int32(v) => v.to_string(),
                Bson::Int64(v) => v.to_string(),
                #[allow(clippy::cast_possible_truncation)]
                Bson::Double(v) if v.fract() == 0.0 => (*v as i64).to_string(),
                Bson::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}_{}", field, direction)
        })
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_default_index_name() {
        assert_eq!(default_index_name(&doc! { "title": 1 }), "title_1");
        assert_eq!(
            default_index_name(&doc! { "author": 1, "published_year": -1 }),
            "author_1_published_year_-1"
        );
        assert_eq!(default_index_name(&doc! { "body": "text" }), "body_text");
    }

    #[test]
    fn test_find_spec_builder() {
        let spec = FindSpec::new().sort(doc! { "price": 1 }).skip(5).limit(5);
        assert_eq!(spec.sort, Some(doc! { "price": 1 }));
        assert_eq!(spec.skip, Some(5));
        assert_eq!(spec.limit, Some(5));
        assert!(spec.projection.is_none());
    }
}
