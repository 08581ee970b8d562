//! Round trip against a real MongoDB server
//!
//! Run with `BOOKSTORE_TEST_URI=mongodb://127.0.0.1:27017 cargo test -- --ignored`.
//! Each run uses its own collection and drops nothing else.

use std::sync::Arc;

use bookstore_catalog::{store, Catalog, CatalogStore};
use bookstore_common::config::{Backend, StoreConfig};
use bookstore_common::SortOrder;

fn live_config() -> Option<StoreConfig> {
    let uri = std::env::var("BOOKSTORE_TEST_URI").ok()?;
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    Some(StoreConfig {
        backend: Backend::MongoDb,
        uri,
        database: "plp_bookstore_test".to_string(),
        collection: format!("books_{}", suffix),
        ..StoreConfig::default()
    })
}

#[tokio::test]
#[ignore = "requires a MongoDB server at BOOKSTORE_TEST_URI"]
async fn test_catalog_round_trip_on_mongodb() {
    let Some(config) = live_config() else {
        eprintln!("BOOKSTORE_TEST_URI not set, skipping");
        return;
    };

    let store: Arc<dyn CatalogStore> = store::connect(&config).await.unwrap();
    let catalog = Catalog::new(store.clone());

    let report = catalog.seed().await.unwrap();
    assert_eq!(report.total, 12);
    assert_eq!(catalog.seed().await.unwrap().total, 12);

    assert_eq!(catalog.find_by_genre("Fiction").await.unwrap().len(), 4);
    assert!(catalog
        .find_published_after(2000)
        .await
        .unwrap()
        .iter()
        .all(|b| b.published_year > 2000));

    let sorted = catalog.sort_by_price(SortOrder::Ascending).await.unwrap();
    assert!(sorted.windows(2).all(|w| w[0].price <= w[1].price));

    let outcome = catalog.update_price("The Great Gatsby", 13.99).await.unwrap();
    assert_eq!(outcome.matched, 1);
    assert_eq!(catalog.delete_by_title("1984").await.unwrap().deleted, 1);

    let summaries = catalog.average_price_by_genre().await.unwrap();
    assert_eq!(summaries.iter().map(|s| s.total_books).sum::<i64>(), 11);

    let top = catalog.author_with_most_books().await.unwrap().unwrap();
    assert_eq!(top.author, "Dan Brown");

    let decades = catalog.by_publication_decade().await.unwrap();
    assert!(decades.iter().any(|d| d.decade == 1920));

    catalog.create_indexes().await.unwrap();
    let indexes = catalog.list_indexes().await.unwrap();
    assert!(indexes.contains(&"title_1".to_string()));
    assert!(indexes.contains(&"author_1_published_year_-1".to_string()));

    let costs = catalog.demonstrate_index_performance().await.unwrap();
    assert_eq!(costs[1].index_used.as_deref(), Some("title_1"));
    assert_eq!(costs[1].docs_examined, 1);

    store.clear().await.unwrap();
    store.close().await.unwrap();
}
