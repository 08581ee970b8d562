//! In-process catalog store
//!
//! Holds one collection in insertion order and evaluates the subset of the
//! MongoDB query language the catalog issues: filters, projections, sorts,
//! `$set` updates and `$match/$project/$group/$sort/$limit/$skip` pipelines.
//! Explain output comes from a small planner that uses an index when the
//! filter pins its leading key by equality.

mod expr;
mod filter;
mod pipeline;
mod value;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use bookstore_common::config::Backend;
use bookstore_common::metrics::OperationTimer;
use bookstore_common::{DeleteOutcome, Error, Result, UpdateOutcome};

use super::{default_index_name, CatalogStore, ExplainStats, FindSpec};

/// Failure evaluating a filter, update, projection or pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("unrecognized pipeline stage name: {0}")]
    UnknownStage(String),

    #[error("{op}: {reason}")]
    BadArgument { op: &'static str, reason: String },
}

fn eval_error(operation: &'static str) -> impl FnOnce(EvalError) -> Error {
    move |e| Error::operation(operation, e.to_string())
}

const ID_INDEX: &str = "_id_";

struct IndexEntry {
    name: String,
    keys: Document,
}

struct CollectionData {
    docs: Vec<Document>,
    indexes: Vec<IndexEntry>,
}

/// Catalog store kept entirely in memory
pub struct MemoryStore {
    data: RwLock<CollectionData>,
    closed: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(CollectionData {
                docs: Vec::new(),
                indexes: vec![IndexEntry {
                    name: ID_INDEX.to_string(),
                    keys: doc! { "_id": 1 },
                }],
            }),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Connection("store has been closed".to_string()));
        }
        Ok(())
    }

    fn timed<T>(&self, operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.ensure_open()?;
        let timer = OperationTimer::start(operation);
        let result = f();
        timer.finish(&result);
        result
    }

    /// Documents matching `filter`, in insertion order
    fn matching(docs: &[Document], filter: &Document, operation: &'static str) -> Result<Vec<Document>> {
        let mut out = Vec::new();
        for doc in docs {
            if filter::matches(doc, filter).map_err(eval_error(operation))? {
                out.push(doc.clone());
            }
        }
        Ok(out)
    }

    fn position(docs: &[Document], filter: &Document, operation: &'static str) -> Result<Option<usize>> {
        for (i, doc) in docs.iter().enumerate() {
            if filter::matches(doc, filter).map_err(eval_error(operation))? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Pick the index whose leading keys the filter constrains the most,
    /// returning it with the conditions on that key prefix
    fn choose_index<'a>(indexes: &'a [IndexEntry], filter: &Document) -> Option<(&'a IndexEntry, Document)> {
        let mut best: Option<(&IndexEntry, Document)> = None;
        for index in indexes {
            let mut bounds = Document::new();
            for (field, _) in &index.keys {
                match filter.get(field) {
                    Some(condition) => {
                        bounds.insert(field.clone(), condition.clone());
                    }
                    None => break,
                }
            }

            let leading_equality = bounds.iter().next().map_or(false, |(_, c)| is_equality(c));
            if !leading_equality {
                continue;
            }
            if best.as_ref().map_or(true, |(_, b)| bounds.len() > b.len()) {
                best = Some((index, bounds));
            }
        }
        best
    }
}

fn is_equality(condition: &Bson) -> bool {
    match condition {
        Bson::Document(d) => match d.iter().next() {
            Some((op, _)) if op.starts_with('$') => d.len() == 1 && op == "$eq",
            _ => true,
        },
        _ => true,
    }
}

fn validate_index_keys(keys: &Document) -> Result<()> {
    if keys.is_empty() {
        return Err(Error::operation("create_index", "index keys must not be empty"));
    }
    for (field, direction) in keys {
        match value::as_f64(direction) {
            Some(d) if d == 1.0 || d == -1.0 => {}
            _ => {
                return Err(Error::operation(
                    "create_index",
                    format!("unsupported index direction for {}: {}", field, direction),
                ))
            }
        }
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for MemoryStore {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_open()
    }

    async fn clear(&self) -> Result<u64> {
        self.timed("clear", || {
            let mut data = self.data.write();
            let removed = data.docs.len() as u64;
            data.docs.clear();
            Ok(removed)
        })
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<u64> {
        self.timed("insert_many", || {
            if docs.is_empty() {
                return Err(Error::operation("insert_many", "no documents to insert"));
            }

            let mut data = self.data.write();
            let mut prepared = Vec::with_capacity(docs.len());
            for doc in docs {
                let doc = if doc.contains_key("_id") {
                    doc
                } else {
                    let mut with_id = doc! { "_id": ObjectId::new() };
                    with_id.extend(doc);
                    with_id
                };

                let id = doc.get("_id").cloned().unwrap_or(Bson::Null);
                let duplicate = data
                    .docs
                    .iter()
                    .chain(prepared.iter())
                    .any(|existing: &Document| existing.get("_id").map_or(false, |e| value::values_equal(e, &id)));
                if duplicate {
                    return Err(Error::operation(
                        "insert_many",
                        format!("duplicate key error on _id: {}", id),
                    ));
                }
                prepared.push(doc);
            }

            let inserted = prepared.len() as u64;
            data.docs.extend(prepared);
            debug!(inserted, "insert_many");
            Ok(inserted)
        })
    }

    async fn count(&self, filter: Document) -> Result<u64> {
        self.timed("count", || {
            let data = self.data.read();
            Ok(Self::matching(&data.docs, &filter, "count")?.len() as u64)
        })
    }

    async fn find(&self, filter: Document, spec: FindSpec) -> Result<Vec<Document>> {
        debug!(?filter, ?spec, "find");
        self.timed("find", || {
            let mut docs = {
                let data = self.data.read();
                Self::matching(&data.docs, &filter, "find")?
            };

            if let Some(sort) = &spec.sort {
                value::sort_documents(&mut docs, sort).map_err(eval_error("find"))?;
            }

            let skip = usize::try_from(spec.skip.unwrap_or(0)).unwrap_or(usize::MAX);
            let limit = match spec.limit {
                None | Some(0) => usize::MAX,
                Some(n) => usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX),
            };
            let page = docs.into_iter().skip(skip).take(limit);

            match &spec.projection {
                Some(projection) => page
                    .map(|doc| expr::project(&doc, projection))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(eval_error("find")),
                None => Ok(page.collect()),
            }
        })
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateOutcome> {
        debug!(?filter, ?update, "update_one");
        self.timed("update_one", || {
            let mut changes = Vec::new();
            for (op, fields) in &update {
                match (op.as_str(), fields) {
                    ("$set", Bson::Document(fields)) => {
                        for (field, value) in fields {
                            if field == "_id" || field.contains('.') {
                                return Err(Error::operation(
                                    "update_one",
                                    format!("cannot $set field {}", field),
                                ));
                            }
                            changes.push((field.clone(), value.clone()));
                        }
                    }
                    ("$set", _) => {
                        return Err(Error::operation("update_one", "$set requires a document"))
                    }
                    (other, _) => {
                        return Err(Error::operation(
                            "update_one",
                            format!("unsupported update operator: {}", other),
                        ))
                    }
                }
            }
            if changes.is_empty() {
                return Err(Error::operation("update_one", "update document must not be empty"));
            }

            let mut data = self.data.write();
            let Some(pos) = Self::position(&data.docs, &filter, "update_one")? else {
                return Ok(UpdateOutcome::default());
            };

            let doc = &mut data.docs[pos];
            let mut modified = false;
            for (field, value) in changes {
                if doc.get(&field) != Some(&value) {
                    doc.insert(field, value);
                    modified = true;
                }
            }

            Ok(UpdateOutcome {
                matched: 1,
                modified: u64::from(modified),
            })
        })
    }

    async fn delete_one(&self, filter: Document) -> Result<DeleteOutcome> {
        debug!(?filter, "delete_one");
        self.timed("delete_one", || {
            let mut data = self.data.write();
            match Self::position(&data.docs, &filter, "delete_one")? {
                Some(pos) => {
                    data.docs.remove(pos);
                    Ok(DeleteOutcome { deleted: 1 })
                }
                None => Ok(DeleteOutcome::default()),
            }
        })
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        debug!(stages = pipeline.len(), "aggregate");
        self.timed("aggregate", || {
            let docs = self.data.read().docs.clone();
            pipeline::run(docs, &pipeline).map_err(eval_error("aggregate"))
        })
    }

    async fn create_index(&self, keys: Document) -> Result<String> {
        self.timed("create_index", || {
            validate_index_keys(&keys)?;
            let mut data = self.data.write();

            if let Some(existing) = data.indexes.iter().find(|i| i.keys == keys) {
                return Ok(existing.name.clone());
            }

            let name = default_index_name(&keys);
            if data.indexes.iter().any(|i| i.name == name) {
                return Err(Error::operation(
                    "create_index",
                    format!("an index named {} already exists with different keys", name),
                ));
            }

            data.indexes.push(IndexEntry {
                name: name.clone(),
                keys,
            });
            Ok(name)
        })
    }

    async fn list_indexes(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.data.read().indexes.iter().map(|i| i.name.clone()).collect())
    }

    async fn explain(&self, filter: Document) -> Result<ExplainStats> {
        self.timed("explain", || {
            let start = Instant::now();
            let data = self.data.read();

            let (candidates, index_used) = match Self::choose_index(&data.indexes, &filter) {
                Some((index, bounds)) => (
                    Self::matching(&data.docs, &bounds, "explain")?,
                    Some(index.name.clone()),
                ),
                None => (data.docs.clone(), None),
            };
            let returned = Self::matching(&candidates, &filter, "explain")?.len() as u64;

            let scanned = candidates.len() as u64;
            Ok(ExplainStats {
                docs_examined: scanned,
                keys_examined: if index_used.is_some() { scanned } else { 0 },
                returned,
                execution_time_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                index_used,
            })
        })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_ids_first() {
        let store = MemoryStore::new();
        store.insert_many(vec![doc! { "title": "Educated" }]).await.unwrap();
        let docs = store.find(doc! {}, FindSpec::new()).await.unwrap();
        assert_eq!(docs[0].keys().next().map(String::as_str), Some("_id"));
        assert!(docs[0].get_object_id("_id").is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejects_whole_batch() {
        let store = MemoryStore::new();
        let err = store
            .insert_many(vec![doc! { "_id": 1, "title": "a" }, doc! { "_id": 1, "title": "b" }])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Operation { operation: "insert_many", .. }));
        assert_eq!(store.count(doc! {}).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_reports_unmodified_when_value_unchanged() {
        let store = MemoryStore::new();
        store.insert_many(vec![doc! { "title": "a", "price": 1.5 }]).await.unwrap();

        let same = store
            .update_one(doc! { "title": "a" }, doc! { "$set": { "price": 1.5 } })
            .await
            .unwrap();
        assert_eq!(same, UpdateOutcome { matched: 1, modified: 0 });

        let missing = store
            .update_one(doc! { "title": "z" }, doc! { "$set": { "price": 2.0 } })
            .await
            .unwrap();
        assert_eq!(missing, UpdateOutcome::default());
    }

    #[tokio::test]
    async fn test_update_rejects_replacement_documents() {
        let store = MemoryStore::new();
        store.insert_many(vec![doc! { "title": "a" }]).await.unwrap();
        assert!(store
            .update_one(doc! { "title": "a" }, doc! { "price": 3.0 })
            .await
            .is_err());
        assert!(store
            .update_one(doc! { "title": "a" }, doc! { "$inc": { "price": 1 } })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_closed_store_refuses_calls() {
        let store = MemoryStore::new();
        store.close().await.unwrap();
        store.close().await.unwrap();
        assert!(store.ping().await.unwrap_err().is_connection());
        assert!(store.count(doc! {}).await.is_err());
    }

    #[tokio::test]
    async fn test_create_index_is_idempotent() {
        let store = MemoryStore::new();
        assert_eq!(store.create_index(doc! { "title": 1 }).await.unwrap(), "title_1");
        assert_eq!(store.create_index(doc! { "title": 1 }).await.unwrap(), "title_1");
        assert_eq!(store.create_index(doc! { "_id": 1 }).await.unwrap(), "_id_");
        assert!(store.create_index(doc! { "title": 2 }).await.is_err());
        assert_eq!(store.list_indexes().await.unwrap(), vec!["_id_", "title_1"]);
    }

    #[test]
    fn test_is_equality() {
        assert!(is_equality(&Bson::String("x".into())));
        assert!(is_equality(&Bson::Document(doc! { "$eq": 3 })));
        assert!(!is_equality(&Bson::Document(doc! { "$gt": 3 })));
    }
}
