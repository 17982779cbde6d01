//! Client handles over a [DocumentStore].
//!
//! ```ignore
//! let client = Client::connect("localhost:27017").await?;
//! let iris = client.database("flower").collection("iris");
//! let res = iris.insert_one(doc! { "species": "setosa" }).await?;
//! ```

pub mod address;
pub mod cursor;
pub mod local;
pub mod remote;
pub mod store;

use bson::Document;
use std::sync::Arc;
use tracing::info;

pub use address::Address;
pub use cursor::{Cursor, Find};
pub use local::LocalStore;
pub use remote::RemoteStore;
pub use store::DocumentStore;

pub use crate::db::{DeleteResult, InsertManyResult, InsertOneResult, Namespace, UpdateResult};
pub use crate::query::sort::SortOrder;

use crate::error::Result;

/// A connection to a document store.
///
/// Cheap to clone; clones share the underlying store (and, for remote
/// stores, the connection).
#[derive(Clone)]
pub struct Client {
    store: Arc<dyn DocumentStore>,
}

impl Client {
    /// Connects to the store at `address` (see [Address] for the forms).
    ///
    /// Remote stores are pinged before this returns.
    pub async fn connect(address: &str) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match address.parse::<Address>()? {
            Address::Memory => Arc::new(LocalStore::new()),
            Address::Tcp { host, port } => {
                let store = RemoteStore::connect(format!("{}:{}", host, port)).await?;
                store.ping().await?;
                Arc::new(store)
            }
        };
        info!(%address, "connected to document store");
        Ok(Client { store })
    }

    /// Wraps an existing store.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Client { store }
    }

    /// A handle to a database. Nothing is created until the first write.
    pub fn database(&self, name: &str) -> DatabaseRef {
        DatabaseRef {
            store: self.store.clone(),
            name: name.to_string(),
        }
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

/// A handle to a named database.
#[derive(Clone)]
pub struct DatabaseRef {
    store: Arc<dyn DocumentStore>,
    name: String,
}

impl DatabaseRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A handle to a collection. Nothing is created until the first write.
    pub fn collection(&self, name: &str) -> CollectionRef {
        CollectionRef {
            store: self.store.clone(),
            ns: Namespace::new(self.name.as_str(), name),
        }
    }

    /// Looks up a collection, creating it if needed, and returns a handle
    /// to it along with whether it was created.
    pub async fn create_collection(&self, name: &str) -> Result<(CollectionRef, bool)> {
        let coll = self.collection(name);
        let created = self.store.create_collection(&coll.ns).await?;
        Ok((coll, created))
    }

    /// The names of this database's collections, sorted.
    pub async fn list_collection_names(&self) -> Result<Vec<String>> {
        self.store.list_collection_names(&self.name).await
    }
}

/// A handle to a collection.
#[derive(Clone)]
pub struct CollectionRef {
    store: Arc<dyn DocumentStore>,
    ns: Namespace,
}

impl CollectionRef {
    pub fn name(&self) -> &str {
        &self.ns.coll
    }

    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Inserts a document. An `_id` is generated if the document has none.
    pub async fn insert_one(&self, doc: Document) -> Result<InsertOneResult> {
        self.store.insert_one(&self.ns, doc).await
    }

    /// Inserts documents in order, stopping at the first failure.
    pub async fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyResult> {
        self.store.insert_many(&self.ns, docs).await
    }

    /// Starts a find; chain options onto it and `.await` it.
    pub fn find(&self, filter: Document) -> Find<'_> {
        Find::new(self, filter)
    }

    /// The first document matching the filter, in insertion order.
    pub async fn find_one(&self, filter: Document) -> Result<Option<Document>> {
        Ok(self.find(filter).limit(1).await?.next())
    }

    pub async fn count_documents(&self, filter: Document) -> Result<u64> {
        self.store.count(&self.ns, filter).await
    }

    pub async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        self.store.update(&self.ns, filter, update, false).await
    }

    pub async fn update_many(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        self.store.update(&self.ns, filter, update, true).await
    }

    pub async fn delete_one(&self, filter: Document) -> Result<DeleteResult> {
        self.store.delete(&self.ns, filter, false).await
    }

    /// Deletes every matching document; an empty filter empties the
    /// collection but keeps it.
    pub async fn delete_many(&self, filter: Document) -> Result<DeleteResult> {
        self.store.delete(&self.ns, filter, true).await
    }

    /// Drops the collection and everything in it.
    pub async fn drop(&self) -> Result<bool> {
        self.store.drop_collection(&self.ns).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bson::{doc, Bson};

    async fn iris() -> CollectionRef {
        let client = Client::connect("mem://").await.unwrap();
        client.database("flower").collection("iris")
    }

    #[tokio::test]
    async fn handles_are_lazy() {
        let client = Client::connect("mem://").await.unwrap();
        let db = client.database("flower");
        let _ = db.collection("iris");
        assert!(db.list_collection_names().await.unwrap().is_empty());

        let (_, created) = db.create_collection("iris").await.unwrap();
        assert!(created);
        let (_, created) = db.create_collection("iris").await.unwrap();
        assert!(!created);
        assert_eq!(db.list_collection_names().await.unwrap(), vec!["iris".to_string()]);
    }

    #[tokio::test]
    async fn find_chain() {
        let iris = iris().await;
        iris.insert_many(vec![
            doc! { "_id": 1, "sepalLength": 5.1, "species": "setosa" },
            doc! { "_id": 2, "sepalLength": 7.0, "species": "versicolor" },
            doc! { "_id": 3, "sepalLength": 6.3, "species": "virginica" },
        ])
        .await
        .unwrap();

        let names: Vec<Document> = iris
            .find(doc! {})
            .projection(doc! { "species": 1, "_id": 0 })
            .sort("sepalLength", SortOrder::Descending)
            .await
            .unwrap()
            .collect();
        assert_eq!(
            names,
            vec![
                doc! { "species": "versicolor" },
                doc! { "species": "virginica" },
                doc! { "species": "setosa" },
            ]
        );

        let cursor = iris.find(doc! {}).limit(2).await.unwrap();
        assert_eq!(cursor.len(), 2);
    }

    #[tokio::test]
    async fn find_one_and_count() {
        let iris = iris().await;
        let res = iris.insert_one(doc! { "species": "setosa" }).await.unwrap();
        assert!(matches!(res.inserted_id, Bson::ObjectId(_)));
        let found = iris.find_one(doc! { "_id": res.inserted_id.clone() }).await.unwrap();
        assert_eq!(found.unwrap().get_str("species").unwrap(), "setosa");
        assert_eq!(iris.count_documents(doc! {}).await.unwrap(), 1);
        assert!(iris.find_one(doc! { "species": "NA" }).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_address_is_rejected() {
        let err = Client::connect("mongodb://localhost:27017/").await.err().unwrap();
        assert!(matches!(err, crate::error::StoreError::InvalidAddress(_)));
    }
}
