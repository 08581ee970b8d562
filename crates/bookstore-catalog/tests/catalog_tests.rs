//! Catalog service tests against the in-memory store

use std::collections::HashSet;
use std::sync::Arc;

use bookstore_catalog::dataset::{seed_books, SEED_BOOK_COUNT};
use bookstore_catalog::{Catalog, CatalogStore, Error, MemoryStore, DEFAULT_PAGE_SIZE};
use bookstore_common::SortOrder;

async fn seeded_catalog() -> Catalog {
    let catalog = Catalog::new(Arc::new(MemoryStore::new()));
    catalog.seed().await.expect("seed should succeed");
    catalog
}

fn titles<'a>(books: impl IntoIterator<Item = &'a bookstore_common::Book>) -> Vec<&'a str> {
    books.into_iter().map(|b| b.title.as_str()).collect()
}

// ============================================================================
// Seeder
// ============================================================================

mod seeding {
    use super::*;

    #[tokio::test]
    async fn test_seed_reports_counts() {
        let catalog = Catalog::new(Arc::new(MemoryStore::new()));
        let report = catalog.seed().await.unwrap();
        assert_eq!(report.inserted, SEED_BOOK_COUNT as u64);
        assert_eq!(report.total, SEED_BOOK_COUNT as u64);
    }

    #[tokio::test]
    async fn test_seed_twice_leaves_twelve_records() {
        let catalog = seeded_catalog().await;
        let report = catalog.seed().await.unwrap();
        assert_eq!(report.total, 12);
        assert_eq!(catalog.store().count(bson::doc! {}).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_seed_replaces_prior_content() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_many(vec![bson::doc! { "title": "Stray record" }])
            .await
            .unwrap();

        let catalog = Catalog::new(store.clone());
        catalog.seed().await.unwrap();

        assert_eq!(store.count(bson::doc! { "title": "Stray record" }).await.unwrap(), 0);
        assert_eq!(store.count(bson::doc! {}).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_seed_on_closed_store_fails() {
        let store = Arc::new(MemoryStore::new());
        store.close().await.unwrap();
        let catalog = Catalog::new(store);
        assert!(matches!(catalog.seed().await, Err(Error::Connection(_))));
    }
}

// ============================================================================
// Queries
// ============================================================================

mod queries {
    use super::*;

    #[tokio::test]
    async fn test_find_by_genre_exact_match() {
        let catalog = seeded_catalog().await;
        let fiction = catalog.find_by_genre("Fiction").await.unwrap();

        let expected: HashSet<_> = seed_books()
            .into_iter()
            .filter(|b| b.genre == "Fiction")
            .map(|b| b.title)
            .collect();
        let actual: HashSet<_> = fiction.iter().map(|b| b.title.clone()).collect();
        assert_eq!(actual, expected);
        assert_eq!(fiction.len(), 4);

        assert!(catalog.find_by_genre("fiction").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_published_after_is_strict() {
        let catalog = seeded_catalog().await;
        catalog
            .store()
            .insert_many(vec![bson::doc! {
                "title": "Millennium", "author": "Anon", "genre": "Fiction",
                "published_year": 2000, "price": 5.0, "in_stock": true,
                "pages": 100, "publisher": "Nobody",
            }])
            .await
            .unwrap();

        let recent = catalog.find_published_after(2000).await.unwrap();
        assert!(recent.iter().all(|b| b.published_year > 2000));
        assert!(!titles(&recent).contains(&"Millennium"));
        assert_eq!(recent.len(), 4);
    }

    #[tokio::test]
    async fn test_find_by_author() {
        let catalog = seeded_catalog().await;
        let books = catalog.find_by_author("J.K. Rowling").await.unwrap();
        assert_eq!(titles(&books), vec!["Harry Potter and the Philosopher's Stone"]);
        assert!(catalog.find_by_author("Nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_in_stock_after() {
        let catalog = seeded_catalog().await;
        let books = catalog.find_in_stock_after(2010).await.unwrap();
        let found: HashSet<_> = titles(&books).into_iter().collect();
        assert_eq!(found, HashSet::from(["The Girl on the Train", "Educated"]));

        // 1984 is out of stock
        let older = catalog.find_in_stock_after(1940).await.unwrap();
        assert!(!titles(&older).contains(&"1984"));
        assert!(older.iter().all(|b| b.in_stock));
    }

    #[tokio::test]
    async fn test_projection_restricts_fields() {
        let catalog = seeded_catalog().await;
        let fantasy = catalog.find_by_genre_projected("Fantasy").await.unwrap();
        assert_eq!(fantasy.len(), 2);
        assert!(fantasy.iter().any(|b| b.title == "The Hobbit" && b.author == "J.R.R. Tolkien"));

        let raw = catalog
            .store()
            .find(
                bson::doc! { "genre": "Fantasy" },
                bookstore_catalog::FindSpec::new()
                    .projection(bson::doc! { "title": 1, "author": 1, "price": 1, "_id": 0 }),
            )
            .await
            .unwrap();
        for doc in raw {
            let keys: HashSet<_> = doc.keys().map(String::as_str).collect();
            assert_eq!(keys, HashSet::from(["title", "author", "price"]));
        }
    }

    #[tokio::test]
    async fn test_sort_by_price_both_directions() {
        let catalog = seeded_catalog().await;

        let ascending = catalog.sort_by_price(SortOrder::Ascending).await.unwrap();
        assert_eq!(ascending.len(), 12);
        assert!(ascending.windows(2).all(|w| w[0].price <= w[1].price));
        assert_eq!(ascending[0].title, "Pride and Prejudice");

        let descending = catalog.sort_by_price(SortOrder::Descending).await.unwrap();
        assert!(descending.windows(2).all(|w| w[0].price >= w[1].price));
        assert_eq!(descending[0].title, "Harry Potter and the Philosopher's Stone");
    }

    #[tokio::test]
    async fn test_pages_are_disjoint_and_cover_first_ten() {
        let catalog = seeded_catalog().await;

        let first = catalog.paginate(1, DEFAULT_PAGE_SIZE).await.unwrap();
        let second = catalog.paginate(2, DEFAULT_PAGE_SIZE).await.unwrap();
        let third = catalog.paginate(3, DEFAULT_PAGE_SIZE).await.unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(second.len(), 5);
        assert_eq!(third.len(), 2);

        let a: HashSet<_> = titles(&first).into_iter().collect();
        let b: HashSet<_> = titles(&second).into_iter().collect();
        assert!(a.is_disjoint(&b));

        let union: Vec<_> = titles(first.iter().chain(second.iter()));
        let seeded: Vec<_> = seed_books().into_iter().take(10).map(|b| b.title).collect();
        assert_eq!(union, seeded);
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty() {
        let catalog = seeded_catalog().await;
        assert!(catalog.paginate(4, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paginate_rejects_page_zero_and_empty_pages() {
        let catalog = seeded_catalog().await;
        assert!(matches!(
            catalog.paginate(0, 5).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            catalog.paginate(1, 0).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            catalog.paginate(u64::MAX, 5).await,
            Err(Error::InvalidArgument(_))
        ));
    }
}

// ============================================================================
// Mutations
// ============================================================================

mod mutations {
    use super::*;

    #[tokio::test]
    async fn test_update_price_changes_only_target() {
        let catalog = seeded_catalog().await;
        let before = catalog.sort_by_price(SortOrder::Ascending).await.unwrap();

        let outcome = catalog.update_price("The Great Gatsby", 13.99).await.unwrap();
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.modified, 1);

        let after = catalog.paginate(1, 100).await.unwrap();
        for book in &after {
            if book.title == "The Great Gatsby" {
                assert!((book.price - 13.99).abs() < f64::EPSILON);
                assert_eq!(book.author, "F. Scott Fitzgerald");
            } else {
                let unchanged = before.iter().find(|b| b.title == book.title).unwrap();
                assert_eq!(book, unchanged);
            }
        }
    }

    #[tokio::test]
    async fn test_update_price_missing_title_is_noop() {
        let catalog = seeded_catalog().await;
        let outcome = catalog.update_price("Moby Dick", 8.0).await.unwrap();
        assert_eq!(outcome.matched, 0);
        assert_eq!(outcome.modified, 0);
    }

    #[tokio::test]
    async fn test_update_price_rejects_invalid_prices() {
        let catalog = seeded_catalog().await;
        assert!(matches!(
            catalog.update_price("The Great Gatsby", -1.0).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            catalog.update_price("The Great Gatsby", f64::NAN).await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_by_title_removes_one() {
        let catalog = seeded_catalog().await;
        let outcome = catalog.delete_by_title("1984").await.unwrap();
        assert_eq!(outcome.deleted, 1);

        let dystopian = catalog.find_by_genre("Dystopian").await.unwrap();
        assert_eq!(titles(&dystopian), vec!["The Hunger Games"]);
        assert_eq!(catalog.store().count(bson::doc! {}).await.unwrap(), 11);

        let again = catalog.delete_by_title("1984").await.unwrap();
        assert_eq!(again.deleted, 0);
    }
}

// ============================================================================
// Aggregations
// ============================================================================

mod aggregations {
    use super::*;

    #[tokio::test]
    async fn test_average_price_by_genre() {
        let catalog = seeded_catalog().await;
        let summaries = catalog.average_price_by_genre().await.unwrap();
        let books = seed_books();

        let total: i64 = summaries.iter().map(|s| s.total_books).sum();
        assert_eq!(total, 12);
        assert_eq!(summaries.len(), 6);

        for summary in &summaries {
            let prices: Vec<f64> = books
                .iter()
                .filter(|b| b.genre == summary.genre)
                .map(|b| b.price)
                .collect();
            #[allow(clippy::cast_precision_loss)]
            let mean = prices.iter().sum::<f64>() / prices.len() as f64;
            assert!((summary.average_price - mean).abs() < 1e-9, "genre {}", summary.genre);
            assert_eq!(summary.total_books, prices.len() as i64);
        }

        assert!(summaries
            .windows(2)
            .all(|w| w[0].average_price >= w[1].average_price));
        assert_eq!(summaries[0].genre, "Fantasy");
    }

    #[tokio::test]
    async fn test_author_with_most_books_breaks_ties_lexicographically() {
        let catalog = seeded_catalog().await;
        let top = catalog.author_with_most_books().await.unwrap().unwrap();
        assert_eq!(top.book_count, 1);
        assert_eq!(top.author, "Dan Brown");
    }

    #[tokio::test]
    async fn test_author_with_most_books_prefers_higher_count() {
        let catalog = seeded_catalog().await;
        catalog
            .store()
            .insert_many(vec![bson::doc! {
                "title": "The Silmarillion", "author": "J.R.R. Tolkien", "genre": "Fantasy",
                "published_year": 1977, "price": 18.99, "in_stock": true,
                "pages": 365, "publisher": "George Allen & Unwin",
            }])
            .await
            .unwrap();

        let top = catalog.author_with_most_books().await.unwrap().unwrap();
        assert_eq!(top.author, "J.R.R. Tolkien");
        assert_eq!(top.book_count, 2);
    }

    #[tokio::test]
    async fn test_author_with_most_books_on_empty_catalog() {
        let catalog = Catalog::new(Arc::new(MemoryStore::new()));
        assert!(catalog.author_with_most_books().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_by_publication_decade() {
        let catalog = seeded_catalog().await;
        let buckets = catalog.by_publication_decade().await.unwrap();

        assert!(buckets.windows(2).all(|w| w[0].decade < w[1].decade));
        assert_eq!(buckets.first().unwrap().decade, 1810);

        let nineties = buckets.iter().find(|b| b.decade == 1990).unwrap();
        assert!(nineties
            .books
            .contains(&"Harry Potter and the Philosopher's Stone".to_string()));

        let twenties = buckets.iter().find(|b| b.decade == 1920).unwrap();
        assert_eq!(twenties.books, vec!["The Great Gatsby".to_string()]);

        let fifties = buckets.iter().find(|b| b.decade == 1950).unwrap();
        assert_eq!(fifties.book_count, 1);

        let total: i64 = buckets.iter().map(|b| b.book_count).sum();
        assert_eq!(total, 12);
        assert!(buckets.iter().all(|b| b.book_count == b.books.len() as i64));
    }
}

// ============================================================================
// Indexes
// ============================================================================

mod indexes {
    use super::*;

    #[tokio::test]
    async fn test_create_and_list_indexes() {
        let catalog = seeded_catalog().await;
        let created = catalog.create_indexes().await.unwrap();
        assert_eq!(created, vec!["title_1", "author_1_published_year_-1"]);

        let listed = catalog.list_indexes().await.unwrap();
        assert_eq!(listed, vec!["_id_", "title_1", "author_1_published_year_-1"]);

        // Creating again does not add duplicates
        catalog.create_indexes().await.unwrap();
        assert_eq!(catalog.list_indexes().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_index_performance_report() {
        let catalog = seeded_catalog().await;

        let before = catalog.demonstrate_index_performance().await.unwrap();
        assert_eq!(before.len(), 3);
        assert!(before.iter().all(|c| c.index_used.is_none() && c.docs_examined == 12));

        catalog.create_indexes().await.unwrap();
        let after = catalog.demonstrate_index_performance().await.unwrap();

        let genre = &after[0];
        assert_eq!(genre.index_used, None);
        assert_eq!(genre.docs_examined, 12);
        assert_eq!(genre.returned, 4);

        let title = &after[1];
        assert_eq!(title.index_used.as_deref(), Some("title_1"));
        assert_eq!(title.docs_examined, 1);
        assert_eq!(title.keys_examined, 1);
        assert_eq!(title.returned, 1);

        let compound = &after[2];
        assert_eq!(compound.index_used.as_deref(), Some("author_1_published_year_-1"));
        assert_eq!(compound.docs_examined, 1);
        assert_eq!(compound.returned, 1);
    }
}
