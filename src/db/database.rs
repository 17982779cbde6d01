use crate::db::collection::Collection;
use crate::db::namespace::Namespace;
use std::collections::BTreeMap;

pub struct DBMeta {
    /// The name of the database.
    pub name: String,
}

/// A representation of a database (a group of [Collection]s).
pub struct Database {
    /// The metadata for this database.
    pub meta: DBMeta,

    /// The collections in this database, by name.
    collections: BTreeMap<String, Collection>,
}

impl Database {
    /// Creates a new, empty database.
    pub fn new(name: &str) -> Self {
        Database {
            meta: DBMeta {
                name: name.to_string(),
            },
            collections: BTreeMap::new(),
        }
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Gets a collection for writing, creating it if it doesn't exist.
    pub fn collection_mut(&mut self, name: &str) -> &mut Collection {
        let db = &self.meta.name;
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(Namespace::new(db.as_str(), name)))
    }

    /// Creates a collection unless it already exists. Returns whether it
    /// was created.
    pub fn create_collection(&mut self, name: &str) -> bool {
        if self.collections.contains_key(name) {
            return false;
        }
        self.collection_mut(name);
        true
    }

    /// Drops a collection. Returns whether it existed.
    pub fn drop_collection(&mut self, name: &str) -> bool {
        self.collections.remove(name).is_some()
    }

    /// The names of this database's collections, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bson::doc;

    #[test]
    fn collections_are_created_lazily() {
        let mut db = Database::new("flower");
        assert!(db.is_empty());
        assert!(db.collection("iris").is_none());

        db.collection_mut("iris").insert(doc! { "_id": 1 }).unwrap();
        assert_eq!(db.collection_names(), vec!["iris".to_string()]);
        assert_eq!(db.collection("iris").unwrap().len(), 1);
        assert_eq!(db.collection("iris").unwrap().meta.ns.to_string(), "flower.iris");
    }

    #[test]
    fn create_is_idempotent() {
        let mut db = Database::new("flower");
        assert!(db.create_collection("iris"));
        db.collection_mut("iris").insert(doc! { "_id": 1 }).unwrap();
        assert!(!db.create_collection("iris"));
        assert_eq!(db.collection("iris").unwrap().len(), 1);
    }

    #[test]
    fn drop_removes_the_collection() {
        let mut db = Database::new("flower");
        db.create_collection("iris");
        db.create_collection("rose");
        assert_eq!(db.collection_names(), vec!["iris".to_string(), "rose".to_string()]);
        assert!(db.drop_collection("iris"));
        assert!(!db.drop_collection("iris"));
        assert_eq!(db.collection_names(), vec!["rose".to_string()]);
    }
}
