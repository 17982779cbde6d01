//! Error types shared by the store, the client and the wire protocol.

use bson::Bson;
use thiserror::Error;

/// The result type returned by store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// An error raised by a document store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert would have created a second document with the same `_id`.
    #[error("duplicate key in {ns}: _id {id}")]
    DuplicateKey { ns: String, id: Bson },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid projection: {0}")]
    InvalidProjection(String),

    #[error("invalid sort: {0}")]
    InvalidSort(String),

    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bson encoding error: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("bson decoding error: {0}")]
    Decode(#[from] bson::de::Error),

    /// The peer sent something that doesn't follow the wire protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An error reported by a remote server.
    #[error("server error [{code}]: {message}")]
    Remote { code: String, message: String },
}

impl StoreError {
    /// A short, stable code for this error, sent over the wire.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::DuplicateKey { .. } => "DuplicateKey",
            StoreError::InvalidDocument(_) => "InvalidDocument",
            StoreError::InvalidFilter(_) => "InvalidFilter",
            StoreError::InvalidProjection(_) => "InvalidProjection",
            StoreError::InvalidSort(_) => "InvalidSort",
            StoreError::InvalidUpdate(_) => "InvalidUpdate",
            StoreError::InvalidAddress(_) => "InvalidAddress",
            StoreError::Io(_) => "Io",
            StoreError::Encode(_) | StoreError::Decode(_) => "Bson",
            StoreError::Protocol(_) => "Protocol",
            StoreError::Remote { .. } => "Remote",
        }
    }
}
