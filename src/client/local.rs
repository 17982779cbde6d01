use async_trait::async_trait;
use bson::Document;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::client::store::DocumentStore;
use crate::db::{DeleteResult, Engine, InsertManyResult, InsertOneResult, Namespace, UpdateResult};
use crate::error::Result;
use crate::query::FindOptions;

/// An in-process store: an [Engine] behind an async-aware lock.
///
/// Clones share the same engine. Each operation holds the lock for its
/// whole duration, so operations are atomic with respect to each other.
#[derive(Clone, Default)]
pub struct LocalStore {
    engine: Arc<RwLock<Engine>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn list_collection_names(&self, db: &str) -> Result<Vec<String>> {
        Ok(self.engine.read().await.list_collection_names(db))
    }

    async fn create_collection(&self, ns: &Namespace) -> Result<bool> {
        Ok(self.engine.write().await.create_collection(ns))
    }

    async fn insert_one(&self, ns: &Namespace, doc: Document) -> Result<InsertOneResult> {
        self.engine.write().await.insert_one(ns, doc)
    }

    async fn insert_many(&self, ns: &Namespace, docs: Vec<Document>) -> Result<InsertManyResult> {
        self.engine.write().await.insert_many(ns, docs)
    }

    async fn find(
        &self,
        ns: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>> {
        self.engine.read().await.find(ns, &filter, &options)
    }

    async fn count(&self, ns: &Namespace, filter: Document) -> Result<u64> {
        self.engine.read().await.count(ns, &filter)
    }

    async fn update(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
        multi: bool,
    ) -> Result<UpdateResult> {
        self.engine.write().await.update(ns, &filter, &update, multi)
    }

    async fn delete(&self, ns: &Namespace, filter: Document, multi: bool) -> Result<DeleteResult> {
        self.engine.write().await.delete(ns, &filter, multi)
    }

    async fn drop_collection(&self, ns: &Namespace) -> Result<bool> {
        Ok(self.engine.write().await.drop_collection(ns))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bson::doc;

    #[tokio::test]
    async fn clones_share_the_engine() {
        let a = LocalStore::new();
        let b = a.clone();
        let ns = Namespace::new("flower", "iris");
        a.insert_one(&ns, doc! { "_id": 1 }).await.unwrap();
        assert_eq!(b.count(&ns, doc! {}).await.unwrap(), 1);
        assert_eq!(b.list_collection_names("flower").await.unwrap(), vec!["iris".to_string()]);
    }
}
