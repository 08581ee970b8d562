//! Catalog service object

use std::sync::Arc;

use bson::Document;
use serde::de::DeserializeOwned;
use tracing::error;

use bookstore_common::{Error, Result};

use crate::store::{CatalogStore, FindSpec};

/// Stateless catalog operations over one shared store handle
///
/// The operations live in the `seeder`, `query`, `mutation`, `aggregation`
/// and `indexes` modules. Each one is a single store call (or a short
/// sequence of them) awaited in order.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn CatalogStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Run a find and decode every document
    pub(crate) async fn find_as<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        filter: Document,
        spec: FindSpec,
    ) -> Result<Vec<T>> {
        let docs = self.store.find(filter, spec).await.inspect_err(|e| {
            error!(operation, error = %e, "catalog query failed");
        })?;
        decode_all(operation, docs)
    }

    /// Run a pipeline and decode every output document
    pub(crate) async fn aggregate_as<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<T>> {
        let docs = self.store.aggregate(pipeline).await.inspect_err(|e| {
            error!(operation, error = %e, "catalog aggregation failed");
        })?;
        decode_all(operation, docs)
    }
}

fn decode_all<T: DeserializeOwned>(operation: &'static str, docs: Vec<Document>) -> Result<Vec<T>> {
    docs.into_iter()
        .map(|doc| {
            bson::from_document(doc).map_err(|e| {
                error!(operation, error = %e, "unexpected document shape");
                Error::Serialization(format!("{}: {}", operation, e))
            })
        })
        .collect()
}
