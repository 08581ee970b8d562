//! MongoDB-backed catalog store

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, error, info};

use bookstore_common::config::{Backend, StoreConfig};
use bookstore_common::metrics::OperationTimer;
use bookstore_common::{DeleteOutcome, Error, Result, UpdateOutcome};

use super::{CatalogStore, ExplainStats, FindSpec};

/// Catalog store talking to a MongoDB server through the official driver
pub struct MongoStore {
    client: Client,
    database: Database,
    collection: Collection<Document>,
    closed: AtomicBool,
}

impl MongoStore {
    /// Connect and ping the server
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| Error::Connection(format!("invalid uri {}: {}", config.uri, e)))?;
        options.app_name = Some(config.app_name.clone());

        let client = Client::with_options(options)
            .map_err(|e| Error::Connection(e.to_string()))?;
        let database = client.database(&config.database);
        let collection = database.collection::<Document>(&config.collection);

        let store = Self {
            client,
            database,
            collection,
            closed: AtomicBool::new(false),
        };

        if let Err(e) = store.ping().await {
            error!(uri = %config.uri, error = %e, "Connection to MongoDB failed");
            store.close().await.ok();
            return Err(e);
        }

        info!(
            database = %config.database,
            collection = %config.collection,
            "Connected to MongoDB"
        );
        Ok(store)
    }

    async fn explain_command(&self, filter: Document) -> mongodb::error::Result<Document> {
        self.database
            .run_command(
                doc! {
                    "explain": { "find": self.collection.name(), "filter": filter },
                    "verbosity": "executionStats",
                },
                None,
            )
            .await
    }
}

/// Split driver failures into unreachable-store and rejected-operation errors
fn driver_error(operation: &'static str) -> impl FnOnce(mongodb::error::Error) -> Error {
    move |err| match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::Authentication { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => Error::Connection(err.to_string()),
        _ => Error::operation(operation, err.to_string()),
    }
}

fn as_count(value: Option<&Bson>) -> u64 {
    match value {
        Some(Bson::Int32(v)) => u64::try_from(*v).unwrap_or(0),
        Some(Bson::Int64(v)) => u64::try_from(*v).unwrap_or(0),
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(Bson::Double(v)) if *v >= 0.0 => *v as u64,
        _ => 0,
    }
}

/// Find the IXSCAN stage of a winning plan and return its index name
///
/// Classic plans nest stages through `inputStage`/`inputStages`; slot-based
/// plans wrap them in `queryPlan`.
fn scanned_index(plan: &Document) -> Option<String> {
    if plan.get_str("stage").ok() == Some("IXSCAN") {
        return plan.get_str("indexName").ok().map(str::to_string);
    }
    for key in ["queryPlan", "inputStage"] {
        if let Ok(child) = plan.get_document(key) {
            if let Some(name) = scanned_index(child) {
                return Some(name);
            }
        }
    }
    plan.get_array("inputStages").ok().and_then(|stages| {
        stages.iter().find_map(|stage| match stage {
            Bson::Document(child) => scanned_index(child),
            _ => None,
        })
    })
}

fn parse_explain(output: &Document) -> Result<ExplainStats> {
    let stats = output
        .get_document("executionStats")
        .map_err(|_| Error::operation("explain", "response has no executionStats"))?;

    let index_used = output
        .get_document("queryPlanner")
        .and_then(|planner| planner.get_document("winningPlan"))
        .ok()
        .and_then(scanned_index);

    Ok(ExplainStats {
        docs_examined: as_count(stats.get("totalDocsExamined")),
        keys_examined: as_count(stats.get("totalKeysExamined")),
        returned: as_count(stats.get("nReturned")),
        execution_time_ms: as_count(stats.get("executionTimeMillis")),
        index_used,
    })
}

#[async_trait]
impl CatalogStore for MongoStore {
    fn backend(&self) -> Backend {
        Backend::MongoDb
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(driver_error("ping"))
    }

    async fn clear(&self) -> Result<u64> {
        let timer = OperationTimer::start("clear");
        let result = self
            .collection
            .delete_many(doc! {}, None)
            .await
            .map(|r| r.deleted_count)
            .map_err(driver_error("clear"));
        timer.finish(&result);
        result
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<u64> {
        let timer = OperationTimer::start("insert_many");
        let result = self
            .collection
            .insert_many(docs, None)
            .await
            .map(|r| r.inserted_ids.len() as u64)
            .map_err(driver_error("insert_many"));
        timer.finish(&result);
        result
    }

    async fn count(&self, filter: Document) -> Result<u64> {
        let timer = OperationTimer::start("count");
        let result = self
            .collection
            .count_documents(filter, None)
            .await
            .map_err(driver_error("count"));
        timer.finish(&result);
        result
    }

    async fn find(&self, filter: Document, spec: FindSpec) -> Result<Vec<Document>> {
        debug!(?filter, ?spec, "find");
        let timer = OperationTimer::start("find");

        let mut options = FindOptions::default();
        options.projection = spec.projection;
        options.sort = spec.sort;
        options.skip = spec.skip;
        options.limit = spec.limit;

        let result = match self.collection.find(filter, options).await {
            Ok(cursor) => cursor.try_collect().await.map_err(driver_error("find")),
            Err(e) => Err(driver_error("find")(e)),
        };
        timer.finish(&result);
        result
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateOutcome> {
        debug!(?filter, ?update, "update_one");
        let timer = OperationTimer::start("update_one");
        let result = self
            .collection
            .update_one(filter, update, None)
            .await
            .map(|r| UpdateOutcome {
                matched: r.matched_count,
                modified: r.modified_count,
            })
            .map_err(driver_error("update_one"));
        timer.finish(&result);
        result
    }

    async fn delete_one(&self, filter: Document) -> Result<DeleteOutcome> {
        debug!(?filter, "delete_one");
        let timer = OperationTimer::start("delete_one");
        let result = self
            .collection
            .delete_one(filter, None)
            .await
            .map(|r| DeleteOutcome {
                deleted: r.deleted_count,
            })
            .map_err(driver_error("delete_one"));
        timer.finish(&result);
        result
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        debug!(stages = pipeline.len(), "aggregate");
        let timer = OperationTimer::start("aggregate");
        let result = match self.collection.aggregate(pipeline, None).await {
            Ok(cursor) => cursor.try_collect().await.map_err(driver_error("aggregate")),
            Err(e) => Err(driver_error("aggregate")(e)),
        };
        timer.finish(&result);
        result
    }

    async fn create_index(&self, keys: Document) -> Result<String> {
        let timer = OperationTimer::start("create_index");
        let model = IndexModel::builder().keys(keys).build();
        let result = self
            .collection
            .create_index(model, None)
            .await
            .map(|r| r.index_name)
            .map_err(driver_error("create_index"));
        timer.finish(&result);
        result
    }

    async fn list_indexes(&self) -> Result<Vec<String>> {
        self.collection
            .list_index_names()
            .await
            .map_err(driver_error("list_indexes"))
    }

    async fn explain(&self, filter: Document) -> Result<ExplainStats> {
        let timer = OperationTimer::start("explain");
        let result = match self.explain_command(filter).await {
            Ok(output) => parse_explain(&output),
            Err(e) => Err(driver_error("explain")(e)),
        };
        timer.finish(&result);
        result
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.client.clone().shutdown().await;
        info!("Disconnected from MongoDB");
        Ok(())
    }
}
