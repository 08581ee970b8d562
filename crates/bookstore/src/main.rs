//! PLP Bookstore
//!
//! Single binary that:
//! - seeds the `books` collection with the fixed catalog
//! - runs the numbered query, update, aggregation and index demonstration
//! - checks that the store is reachable

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bookstore_catalog::{store, Catalog};
use bookstore_common::config::{Backend, LogFormat, LoggingConfig};

mod cli;
mod config;
mod demo;

#[derive(Parser)]
#[command(name = "bookstore")]
#[command(author, version, about = "PLP bookstore catalog on MongoDB", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path (TOML or JSON); defaults apply when absent
    #[arg(short, long, default_value = "bookstore.toml", env = "BOOKSTORE_CONFIG")]
    config: String,

    /// MongoDB connection string
    #[arg(long, env = "BOOKSTORE_URI")]
    uri: Option<String>,

    /// Store backend (mongodb or memory)
    #[arg(long, env = "BOOKSTORE_BACKEND")]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the catalog with the seed dataset
    Seed,

    /// Run the full demonstration (the default)
    Demo {
        /// Seed the catalog before the demonstration
        #[arg(long)]
        seed: bool,
    },

    /// Connect, ping the server and disconnect
    Ping,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("bookstore={}", logging.level)))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match logging.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load(&cli.config, cli.uri.as_deref(), cli.backend).await?;
    init_tracing(&config.logging)?;

    let store = store::connect(&config.store).await.inspect_err(|e| {
        error!(uri = %config.store.uri, error = %e, "Could not open the catalog store");
    })?;
    info!(
        backend = %store.backend(),
        database = %config.store.database,
        collection = %config.store.collection,
        "Connected to catalog store"
    );

    let catalog = Catalog::new(store.clone());
    let command = cli.command.unwrap_or(Commands::Demo { seed: false });

    let result = match command {
        Commands::Seed => cli::handle_seed(&catalog).await,
        Commands::Ping => cli::handle_ping(store.as_ref(), &config.store).await,
        Commands::Demo { seed } => {
            let seed_first = seed || store.backend() == Backend::Memory;
            let mut stdout = std::io::stdout().lock();
            demo::run(&catalog, seed_first, &mut stdout).await
        }
    };

    if let Err(e) = &result {
        error!(error = %e, "Run failed");
    }

    match store.close().await {
        Ok(()) => info!("Disconnected from catalog store"),
        Err(e) => warn!(error = %e, "Closing the catalog store failed"),
    }

    result
}
