use bson::Document;
use std::collections::HashMap;
use tracing::debug;

use crate::db::database::Database;
use crate::db::namespace::Namespace;
use crate::db::results::*;
use crate::db::collection::Collection;
use crate::error::Result;
use crate::query::filter::Filter;
use crate::query::update::Update;
use crate::query::{FindOptions, FindPlan};

/// The top-level store: every database on this node.
///
/// Databases and collections spring into existence on first write and a
/// database disappears with its last collection. Reads against a missing
/// namespace behave as reads against an empty collection.
#[derive(Default)]
pub struct Engine {
    databases: HashMap<String, Database>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, ns: &Namespace) -> Option<&Collection> {
        self.databases.get(&ns.db)?.collection(&ns.coll)
    }

    fn existing_collection_mut(&mut self, ns: &Namespace) -> Option<&mut Collection> {
        let db = self.databases.get_mut(&ns.db)?;
        if db.collection(&ns.coll).is_none() {
            return None;
        }
        Some(db.collection_mut(&ns.coll))
    }

    fn collection_mut(&mut self, ns: &Namespace) -> &mut Collection {
        self.databases
            .entry(ns.db.clone())
            .or_insert_with(|| Database::new(&ns.db))
            .collection_mut(&ns.coll)
    }

    /// The sorted collection names of a database (empty if it doesn't exist).
    pub fn list_collection_names(&self, db: &str) -> Vec<String> {
        self.databases
            .get(db)
            .map(Database::collection_names)
            .unwrap_or_default()
    }

    /// Creates a collection unless it exists. Returns whether it was created.
    pub fn create_collection(&mut self, ns: &Namespace) -> bool {
        let created = self
            .databases
            .entry(ns.db.clone())
            .or_insert_with(|| Database::new(&ns.db))
            .create_collection(&ns.coll);
        if created {
            debug!(%ns, "created collection");
        }
        created
    }

    pub fn insert_one(&mut self, ns: &Namespace, doc: Document) -> Result<InsertOneResult> {
        let inserted_id = self.collection_mut(ns).insert(doc)?;
        Ok(InsertOneResult { inserted_id })
    }

    pub fn insert_many(&mut self, ns: &Namespace, docs: Vec<Document>) -> Result<InsertManyResult> {
        let inserted_ids = self.collection_mut(ns).insert_many(docs)?;
        Ok(InsertManyResult { inserted_ids })
    }

    pub fn find(
        &self,
        ns: &Namespace,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        let plan = FindPlan::compile(filter, options)?;
        Ok(self
            .collection(ns)
            .map(|c| c.find(&plan))
            .unwrap_or_default())
    }

    pub fn count(&self, ns: &Namespace, filter: &Document) -> Result<u64> {
        let filter = Filter::parse(filter)?;
        Ok(self.collection(ns).map(|c| c.count(&filter)).unwrap_or(0))
    }

    pub fn update(
        &mut self,
        ns: &Namespace,
        filter: &Document,
        update: &Document,
        multi: bool,
    ) -> Result<UpdateResult> {
        let filter = Filter::parse(filter)?;
        let update = Update::parse(update)?;
        match self.existing_collection_mut(ns) {
            Some(c) => c.update(&filter, &update, multi),
            None => Ok(UpdateResult::default()),
        }
    }

    pub fn delete(&mut self, ns: &Namespace, filter: &Document, multi: bool) -> Result<DeleteResult> {
        let parsed = Filter::parse(filter)?;
        Ok(match self.existing_collection_mut(ns) {
            Some(c) if multi && filter.is_empty() => c.clear(),
            Some(c) => c.delete(&parsed, multi),
            None => DeleteResult::default(),
        })
    }

    /// Drops a collection, and its database if that was the last one.
    /// Returns whether the collection existed.
    pub fn drop_collection(&mut self, ns: &Namespace) -> bool {
        let Some(db) = self.databases.get_mut(&ns.db) else {
            return false;
        };
        let dropped = db.drop_collection(&ns.coll);
        if db.is_empty() {
            self.databases.remove(&ns.db);
        }
        if dropped {
            debug!(%ns, "dropped collection");
        }
        dropped
    }
}
