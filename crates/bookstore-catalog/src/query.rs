//! Read-only catalog queries

use bson::doc;

use bookstore_common::{Book, Error, ProjectedBook, Result, SortOrder};

use crate::catalog::Catalog;
use crate::store::FindSpec;

/// Page size used when the caller does not pick one
pub const DEFAULT_PAGE_SIZE: u64 = 5;

impl Catalog {
    /// Books whose genre equals `genre` exactly (case-sensitive)
    pub async fn find_by_genre(&self, genre: &str) -> Result<Vec<Book>> {
        self.find_as("find_by_genre", doc! { "genre": genre }, FindSpec::new())
            .await
    }

    /// Books published strictly after `year`
    pub async fn find_published_after(&self, year: i32) -> Result<Vec<Book>> {
        self.find_as(
            "find_published_after",
            doc! { "published_year": { "$gt": year } },
            FindSpec::new(),
        )
        .await
    }

    pub async fn find_by_author(&self, author: &str) -> Result<Vec<Book>> {
        self.find_as("find_by_author", doc! { "author": author }, FindSpec::new())
            .await
    }

    /// In-stock books published strictly after `year`
    pub async fn find_in_stock_after(&self, year: i32) -> Result<Vec<Book>> {
        self.find_as(
            "find_in_stock_after",
            doc! { "in_stock": true, "published_year": { "$gt": year } },
            FindSpec::new(),
        )
        .await
    }

    /// Books in `genre`, reduced to title, author and price
    pub async fn find_by_genre_projected(&self, genre: &str) -> Result<Vec<ProjectedBook>> {
        self.find_as(
            "find_by_genre_projected",
            doc! { "genre": genre },
            FindSpec::new().projection(doc! { "title": 1, "author": 1, "price": 1, "_id": 0 }),
        )
        .await
    }

    /// Every book ordered by price
    pub async fn sort_by_price(&self, order: SortOrder) -> Result<Vec<Book>> {
        self.find_as(
            "sort_by_price",
            doc! {},
            FindSpec::new().sort(doc! { "price": order.direction() }),
        )
        .await
    }

    /// One page of the catalog in `_id` order; pages are numbered from 1
    pub async fn paginate(&self, page_number: u64, page_size: u64) -> Result<Vec<Book>> {
        if page_number == 0 {
            return Err(Error::InvalidArgument(
                "page numbers start at 1".to_string(),
            ));
        }
        if page_size == 0 {
            return Err(Error::InvalidArgument(
                "page size must be at least 1".to_string(),
            ));
        }

        let skip = (page_number - 1)
            .checked_mul(page_size)
            .ok_or_else(|| Error::InvalidArgument(format!("page {} is out of range", page_number)))?;
        let limit = i64::try_from(page_size)
            .map_err(|_| Error::InvalidArgument(format!("page size {} is too large", page_size)))?;

        self.find_as(
            "paginate",
            doc! {},
            FindSpec::new().sort(doc! { "_id": 1 }).skip(skip).limit(limit),
        )
        .await
    }
}
