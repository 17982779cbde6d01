use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use flowerdb_lib::config::Config;
use flowerdb_lib::walkthrough;
use flowerdb_lib::{logging, Client};

/// Walk through basic CRUD operations on the iris dataset.
#[derive(Debug, Parser)]
#[command(name = "flowerdb_walkthrough", version)]
struct Args {
    /// Store address: mem://, flowerdb://host:port or host:port
    /// [env: FLOWERDB_ADDRESS, default: localhost:27017]
    #[arg(long)]
    address: Option<String>,

    /// JSON dataset to load [env: FLOWERDB_DATASET, default: ./iris.json]
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Database name [env: FLOWERDB_DATABASE, default: flower]
    #[arg(long)]
    database: Option<String>,

    /// Collection name [env: FLOWERDB_COLLECTION, default: iris]
    #[arg(long)]
    collection: Option<String>,

    /// Insert every numbered record in the batch instead of skipping the
    /// first one [env: FLOWERDB_CONTIGUOUS_IDS]
    #[arg(long)]
    contiguous_ids: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(address) = args.address {
        config.address = address;
    }
    if let Some(dataset) = args.dataset {
        config.dataset = dataset;
    }
    if let Some(database) = args.database {
        config.database = database;
    }
    if let Some(collection) = args.collection {
        config.collection = collection;
    }
    config.contiguous_ids |= args.contiguous_ids;

    let client = Client::connect(&config.address)
        .await
        .with_context(|| format!("failed to connect to {}", config.address))?;

    let report = walkthrough::run(&client, &config.walkthrough(), &mut std::io::stdout()).await?;
    info!(
        loaded = report.loaded,
        remaining = report.count_after_deletion,
        "walkthrough finished"
    );
    Ok(())
}
