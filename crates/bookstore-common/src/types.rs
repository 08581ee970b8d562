//! Book record and report types

use serde::{Deserialize, Serialize};

/// A single catalog entry
///
/// The store-assigned `_id` is not part of the record; it is dropped on
/// deserialization and never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: i32,
    pub price: f64,
    pub in_stock: bool,
    pub pages: u32,
    pub publisher: String,
}

impl Book {
    /// Decade the book was published in, e.g. 1997 -> 1990
    pub fn decade(&self) -> i32 {
        self.published_year - self.published_year.rem_euclid(10)
    }
}

/// Book restricted to the fields shown in listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedBook {
    pub title: String,
    pub author: String,
    pub price: f64,
}

/// Price direction for sorted listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// MongoDB sort direction
    pub fn direction(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// One row of the average-price-by-genre report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenrePriceSummary {
    #[serde(rename = "_id")]
    pub genre: String,
    #[serde(rename = "averagePrice")]
    pub average_price: f64,
    #[serde(rename = "totalBooks")]
    pub total_books: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorBookCount {
    #[serde(rename = "_id")]
    pub author: String,
    #[serde(rename = "bookCount")]
    pub book_count: i64,
}

/// Titles published within one decade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecadeBucket {
    #[serde(rename = "_id")]
    pub decade: i32,
    #[serde(rename = "bookCount")]
    pub book_count: i64,
    pub books: Vec<String>,
}

/// Outcome of replacing the catalog with the seed dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub inserted: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub deleted: u64,
}

/// Planner statistics for one explained query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCost {
    pub label: String,
    pub docs_examined: u64,
    pub keys_examined: u64,
    pub returned: u64,
    pub execution_time_ms: u64,
    pub index_used: Option<String>,
}
