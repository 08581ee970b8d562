//! The numbered catalog walkthrough
//!
//! Mirrors the order of the bookstore exercises: basic CRUD, advanced
//! queries, aggregation pipelines, then indexing. Each step prints a
//! heading and its result as pretty JSON.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use bookstore_catalog::{Catalog, DEFAULT_PAGE_SIZE};
use bookstore_common::SortOrder;

fn print_step<W: Write, T: Serialize + ?Sized>(
    out: &mut W,
    number: u32,
    heading: &str,
    value: &T,
) -> Result<()> {
    writeln!(out, "\n{}. {}:", number, heading)?;
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Run every step against `catalog`, writing to `out`
///
/// With `seed_first` the catalog is replaced with the seed dataset before
/// the first step.
pub async fn run<W: Write>(catalog: &Catalog, seed_first: bool, out: &mut W) -> Result<()> {
    if seed_first {
        let report = catalog.seed().await?;
        info!(total = report.total, "Catalog seeded for the demonstration");
    }

    writeln!(out, "PLP BOOKSTORE - MONGODB CATALOG DEMONSTRATION")?;

    // Basic CRUD
    print_step(out, 1, "All Fiction books", &catalog.find_by_genre("Fiction").await?)?;
    print_step(
        out,
        2,
        "Books published after 2000",
        &catalog.find_published_after(2000).await?,
    )?;
    print_step(
        out,
        3,
        "Books by J.K. Rowling",
        &catalog.find_by_author("J.K. Rowling").await?,
    )?;
    print_step(
        out,
        4,
        "Updating price of 'The Great Gatsby' to 13.99",
        &catalog.update_price("The Great Gatsby", 13.99).await?,
    )?;
    print_step(out, 5, "Deleting '1984'", &catalog.delete_by_title("1984").await?)?;

    // Advanced queries
    print_step(
        out,
        6,
        "In-stock books published after 2010",
        &catalog.find_in_stock_after(2010).await?,
    )?;
    print_step(
        out,
        7,
        "Fantasy books with projection",
        &catalog.find_by_genre_projected("Fantasy").await?,
    )?;
    print_step(
        out,
        8,
        "Books sorted by price (ascending)",
        &catalog.sort_by_price(SortOrder::Ascending).await?,
    )?;
    print_step(
        out,
        9,
        "Books sorted by price (descending)",
        &catalog.sort_by_price(SortOrder::Descending).await?,
    )?;
    print_step(
        out,
        10,
        "Pagination",
        &json!({
            "page_size": DEFAULT_PAGE_SIZE,
            "page_1": catalog.paginate(1, DEFAULT_PAGE_SIZE).await?,
            "page_2": catalog.paginate(2, DEFAULT_PAGE_SIZE).await?,
        }),
    )?;

    // Aggregation pipelines
    print_step(
        out,
        11,
        "Average price by genre",
        &catalog.average_price_by_genre().await?,
    )?;
    print_step(
        out,
        12,
        "Author with most books",
        &catalog.author_with_most_books().await?,
    )?;
    print_step(
        out,
        13,
        "Books by publication decade",
        &catalog.by_publication_decade().await?,
    )?;

    // Indexing
    let created = catalog.create_indexes().await?;
    print_step(
        out,
        14,
        "Creating indexes",
        &json!({
            "created": created,
            "indexes": catalog.list_indexes().await?,
        }),
    )?;
    print_step(
        out,
        15,
        "Performance demonstration",
        &catalog.demonstrate_index_performance().await?,
    )?;

    out.flush()?;
    Ok(())
}
