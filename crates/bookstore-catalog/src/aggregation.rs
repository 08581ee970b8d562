//! Reporting pipelines

use bson::{doc, Document};

use bookstore_common::{AuthorBookCount, DecadeBucket, GenrePriceSummary, Result};

use crate::catalog::Catalog;

fn average_price_pipeline() -> Vec<Document> {
    vec![
        doc! {
            "$group": {
                "_id": "$genre",
                "averagePrice": { "$avg": "$price" },
                "totalBooks": { "$sum": 1 },
            }
        },
        doc! { "$sort": { "averagePrice": -1 } },
    ]
}

/// Ties on the count go to the lexicographically smallest author
fn most_books_pipeline() -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": "$author", "bookCount": { "$sum": 1 } } },
        doc! { "$sort": { "bookCount": -1, "_id": 1 } },
        doc! { "$limit": 1 },
    ]
}

fn decade_pipeline() -> Vec<Document> {
    vec![
        doc! {
            "$project": {
                "title": 1,
                "published_year": 1,
                "decade": {
                    "$subtract": ["$published_year", { "$mod": ["$published_year", 10] }]
                },
            }
        },
        doc! {
            "$group": {
                "_id": "$decade",
                "bookCount": { "$sum": 1 },
                "books": { "$push": "$title" },
            }
        },
        doc! { "$sort": { "_id": 1 } },
    ]
}

impl Catalog {
    /// Mean price and book count per genre, most expensive genre first
    pub async fn average_price_by_genre(&self) -> Result<Vec<GenrePriceSummary>> {
        self.aggregate_as("average_price_by_genre", average_price_pipeline())
            .await
    }

    /// The author with the most books, or `None` for an empty catalog
    pub async fn author_with_most_books(&self) -> Result<Option<AuthorBookCount>> {
        let mut top: Vec<AuthorBookCount> = self
            .aggregate_as("author_with_most_books", most_books_pipeline())
            .await?;
        Ok(top.pop())
    }

    /// Titles grouped by decade of publication, oldest decade first
    pub async fn by_publication_decade(&self) -> Result<Vec<DecadeBucket>> {
        self.aggregate_as("by_publication_decade", decade_pipeline())
            .await
    }
}
