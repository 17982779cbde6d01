use async_trait::async_trait;
use bson::Document;

use crate::db::{DeleteResult, InsertManyResult, InsertOneResult, Namespace, UpdateResult};
use crate::error::Result;
use crate::query::FindOptions;

/// The operations a document store offers its clients.
///
/// Implemented in-process by [super::local::LocalStore] and over TCP by
/// [super::remote::RemoteStore]. Client handles
/// ([super::DatabaseRef], [super::CollectionRef]) are thin wrappers
/// that fill in the namespace.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Lists the collections of a database, sorted by name.
    async fn list_collection_names(&self, db: &str) -> Result<Vec<String>>;

    /// Looks up a collection, creating it if it doesn't exist yet.
    /// Returns whether it was created.
    async fn create_collection(&self, ns: &Namespace) -> Result<bool>;

    async fn insert_one(&self, ns: &Namespace, doc: Document) -> Result<InsertOneResult>;

    /// Inserts in order, stopping at the first failure.
    async fn insert_many(&self, ns: &Namespace, docs: Vec<Document>) -> Result<InsertManyResult>;

    async fn find(
        &self,
        ns: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>>;

    async fn count(&self, ns: &Namespace, filter: Document) -> Result<u64>;

    /// Updates the first matching document, or every one when `multi` is set.
    async fn update(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
        multi: bool,
    ) -> Result<UpdateResult>;

    /// Deletes the first matching document, or every one when `multi` is set.
    async fn delete(&self, ns: &Namespace, filter: Document, multi: bool) -> Result<DeleteResult>;

    /// Drops a collection. Returns whether it existed.
    async fn drop_collection(&self, ns: &Namespace) -> Result<bool>;
}
