//! Loading the record dataset from disk.

use bson::Document;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Why a dataset couldn't be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dataset {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset {path:?} is not a JSON array of records: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads an ordered list of records from a JSON file.
///
/// The file must hold a JSON array of objects; each object becomes one
/// document, with its fields in file order.
pub async fn load(path: impl AsRef<Path>) -> Result<Vec<Document>, LoadError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse(&bytes).map_err(|source| LoadError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), records = records.len(), "loaded dataset");
    Ok(records)
}

/// Parses an ordered list of records from JSON bytes.
pub fn parse(json: &[u8]) -> Result<Vec<Document>, serde_json::Error> {
    serde_json::from_slice(json)
}
