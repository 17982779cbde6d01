use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;

use crate::walkthrough::{IdAssignment, WalkthroughConfig};

pub const DEFAULT_ADDRESS: &str = "localhost:27017";
pub const DEFAULT_DATASET: &str = "./iris.json";
pub const DEFAULT_DATABASE: &str = "flower";
pub const DEFAULT_COLLECTION: &str = "iris";
pub const DEFAULT_BIND: &str = "127.0.0.1:27017";

/// Settings for the binaries, read from the environment (and a `.env`
/// file, if present). Command-line flags override these.
#[derive(Clone, Debug)]
pub struct Config {
    /// Where the walkthrough finds its store.
    pub address: String,
    /// The JSON dataset to load.
    pub dataset: PathBuf,
    pub database: String,
    pub collection: String,
    /// Insert every id-assigned record instead of skipping the first one.
    pub contiguous_ids: bool,
    /// The address the server listens on.
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            address: DEFAULT_ADDRESS.to_string(),
            dataset: PathBuf::from(DEFAULT_DATASET),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            contiguous_ids: false,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        Ok(Config {
            address: env::var("FLOWERDB_ADDRESS").unwrap_or(defaults.address),
            dataset: env::var("FLOWERDB_DATASET")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset),
            database: env::var("FLOWERDB_DATABASE").unwrap_or(defaults.database),
            collection: env::var("FLOWERDB_COLLECTION").unwrap_or(defaults.collection),
            contiguous_ids: match env::var("FLOWERDB_CONTIGUOUS_IDS") {
                Ok(v) => parse_flag("FLOWERDB_CONTIGUOUS_IDS", &v)?,
                Err(_) => defaults.contiguous_ids,
            },
            bind: env::var("FLOWERDB_BIND").unwrap_or(defaults.bind),
        })
    }

    /// The walkthrough settings implied by this config.
    pub fn walkthrough(&self) -> WalkthroughConfig {
        WalkthroughConfig {
            dataset: self.dataset.clone(),
            database: self.database.clone(),
            collection: self.collection.clone(),
            id_assignment: if self.contiguous_ids {
                IdAssignment::Contiguous
            } else {
                IdAssignment::Legacy
            },
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{} must be a boolean, got {:?}", name, other),
    }
}
