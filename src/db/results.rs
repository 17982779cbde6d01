//! Results returned by write operations.

use bson::Bson;
use serde::{Deserialize, Serialize};

/// The result of inserting one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOneResult {
    /// The `_id` of the inserted document (generated if it had none).
    pub inserted_id: Bson,
}

/// The result of inserting a batch of documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertManyResult {
    /// The `_id`s of the inserted documents, in input order.
    pub inserted_ids: Vec<Bson>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Number of documents matching the filter (capped at one for `update_one`).
    pub matched_count: u64,

    /// Number of documents actually changed.
    pub modified_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub deleted_count: u64,
}
