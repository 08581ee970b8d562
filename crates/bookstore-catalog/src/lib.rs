//! PLP bookstore catalog
//!
//! Services over a single collection of book records:
//! - **Seeder**: replaces the catalog with the fixed dataset
//! - **Queries**: exact match, range, projection, sort and pagination
//! - **Mutations**: update price and delete by title
//! - **Aggregations**: genre averages, most prolific author, decade buckets
//! - **Indexes**: creation, listing and explain-based cost reports
//!
//! All services go through a [`CatalogStore`], either a MongoDB server via
//! the official driver or the in-process [`MemoryStore`].
//!
//! ```rust,ignore
//! use bookstore_catalog::{store, Catalog};
//!
//! let store = store::connect(&config.store).await?;
//! let catalog = Catalog::new(store.clone());
//! catalog.seed().await?;
//! let fiction = catalog.find_by_genre("Fiction").await?;
//! store.close().await?;
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod aggregation;
pub mod catalog;
pub mod dataset;
pub mod indexes;
pub mod mutation;
pub mod query;
pub mod seeder;
pub mod store;

pub use catalog::Catalog;
pub use query::DEFAULT_PAGE_SIZE;
pub use store::{memory::MemoryStore, mongo::MongoStore, CatalogStore, ExplainStats, FindSpec};

pub use bookstore_common::{Error, Result};
