use bson::oid::ObjectId;
use bson::{Bson, Document};

use crate::db::namespace::Namespace;
use crate::db::results::{DeleteResult, UpdateResult};
use crate::error::{Result, StoreError};
use crate::query::filter::Filter;
use crate::query::update::Update;
use crate::query::FindPlan;
use crate::storage::memtable::MemTable;
use crate::storage::record::{DocKey, Record, ID_FIELD};

pub struct CollectionMeta {
    pub ns: Namespace,
}

/// A collection of documents. Equivalent to a table in a relational database.
///
/// Collections are stored in a [super::database::Database].
pub struct Collection {
    pub meta: CollectionMeta,
    table: MemTable,
}

impl Collection {
    pub fn new(ns: Namespace) -> Self {
        Collection {
            meta: CollectionMeta { ns },
            table: MemTable::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.meta.ns.coll
    }

    pub fn len(&self) -> usize {
        self.table.size()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn get(&self, id: &Bson) -> Option<&Document> {
        self.table.get(&DocKey::from_bson(id))
    }

    /// Inserts a document, generating an `ObjectId` for it if it has no
    /// `_id`. The `_id` always ends up as the document's first field.
    pub fn insert(&mut self, mut doc: Document) -> Result<Bson> {
        let id = doc
            .remove(ID_FIELD)
            .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
        if matches!(id, Bson::Array(_)) {
            return Err(StoreError::InvalidDocument(
                "_id cannot be an array".to_string(),
            ));
        }

        let mut value = Document::new();
        value.insert(ID_FIELD, id.clone());
        for (key, field) in doc {
            value.insert(key, field);
        }

        let record = Record {
            key: DocKey::from_bson(&id),
            value,
        };
        self.table
            .insert(record)
            .map_err(|_| StoreError::DuplicateKey {
                ns: self.meta.ns.to_string(),
                id: id.clone(),
            })?;
        Ok(id)
    }

    /// Inserts documents in order, stopping at the first failure.
    ///
    /// Documents inserted before the failure stay in the collection.
    pub fn insert_many(&mut self, docs: Vec<Document>) -> Result<Vec<Bson>> {
        docs.into_iter().map(|doc| self.insert(doc)).collect()
    }

    /// Runs a compiled find over the collection.
    pub fn find(&self, plan: &FindPlan) -> Vec<Document> {
        match plan.filter.id_lookup() {
            Some(key) => plan.execute(self.table.get(&key).into_iter()),
            None => plan.execute(self.table.iter().map(|r| &r.value)),
        }
    }

    /// Counts the documents matching a filter.
    pub fn count(&self, filter: &Filter) -> u64 {
        self.matching_keys(filter, false).len() as u64
    }

    /// Applies an update to the first matching document, or to all of
    /// them when `multi` is set.
    ///
    /// Each document is updated on a copy that replaces the stored one
    /// only if the whole update succeeds.
    pub fn update(&mut self, filter: &Filter, update: &Update, multi: bool) -> Result<UpdateResult> {
        let keys = self.matching_keys(filter, !multi);
        let mut result = UpdateResult::default();
        for key in keys {
            let Some(stored) = self.table.get_mut(&key) else {
                continue;
            };
            result.matched_count += 1;
            let mut next = stored.clone();
            if update.apply(&mut next)? {
                *stored = next;
                result.modified_count += 1;
            }
        }
        Ok(result)
    }

    /// Deletes the first matching document, or all of them when `multi`
    /// is set.
    pub fn delete(&mut self, filter: &Filter, multi: bool) -> DeleteResult {
        let keys = self.matching_keys(filter, !multi);
        let deleted = keys
            .iter()
            .filter(|key| self.table.remove(key).is_some())
            .count();
        DeleteResult {
            deleted_count: deleted as u64,
        }
    }

    /// Removes every document, keeping the collection itself.
    pub fn clear(&mut self) -> DeleteResult {
        let deleted_count = self.table.size() as u64;
        self.table.clear();
        DeleteResult { deleted_count }
    }

    fn matching_keys(&self, filter: &Filter, first_only: bool) -> Vec<DocKey> {
        if let Some(key) = filter.id_lookup() {
            return match self.table.get(&key) {
                Some(doc) if filter.matches(doc) => vec![key],
                _ => vec![],
            };
        }
        let matching = self
            .table
            .iter()
            .filter(|r| filter.matches(&r.value))
            .map(|r| r.key.clone());
        if first_only {
            matching.take(1).collect()
        } else {
            matching.collect()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::query::FindOptions;
    use bson::doc;

    fn collection() -> Collection {
        Collection::new(Namespace::new("flower", "iris"))
    }

    fn find_all(c: &Collection) -> Vec<Document> {
        let plan = FindPlan::compile(&doc! {}, &FindOptions::default()).unwrap();
        c.find(&plan)
    }

    #[test]
    fn insert_generates_ids_first() {
        let mut c = collection();
        let id = c.insert(doc! { "species": "setosa" }).unwrap();
        assert!(matches!(id, Bson::ObjectId(_)));

        let stored = c.get(&id).unwrap();
        assert_eq!(stored.keys().next().map(String::as_str), Some("_id"));
        assert_eq!(stored.get_str("species").unwrap(), "setosa");
    }

    #[test]
    fn explicit_ids_are_kept_and_moved_first() {
        let mut c = collection();
        let id = c.insert(doc! { "species": "setosa", "_id": 3 }).unwrap();
        assert_eq!(id, Bson::Int32(3));
        assert_eq!(c.get(&Bson::Int64(3)).unwrap(), &doc! { "_id": 3, "species": "setosa" });
    }

    #[test]
    fn duplicate_ids_fail() {
        let mut c = collection();
        c.insert(doc! { "_id": 1 }).unwrap();
        let err = c.insert(doc! { "_id": 1.0 }).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn insert_many_stops_at_first_failure() {
        let mut c = collection();
        let res = c.insert_many(vec![
            doc! { "_id": 1 },
            doc! { "_id": 2 },
            doc! { "_id": 1 },
            doc! { "_id": 3 },
        ]);
        assert!(res.is_err());
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn update_one_only_touches_first_match() {
        let mut c = collection();
        c.insert_many(vec![
            doc! { "_id": 1, "species": "setosa" },
            doc! { "_id": 2, "species": "setosa" },
        ])
        .unwrap();
        let filter = Filter::parse(&doc! { "species": "setosa" }).unwrap();
        let update = Update::parse(&doc! { "$set": { "species": "NA" } }).unwrap();

        let res = c.update(&filter, &update, false).unwrap();
        assert_eq!(res, UpdateResult { matched_count: 1, modified_count: 1 });
        assert_eq!(c.get(&Bson::Int32(1)).unwrap().get_str("species").unwrap(), "NA");
        assert_eq!(c.get(&Bson::Int32(2)).unwrap().get_str("species").unwrap(), "setosa");

        let res = c.update(&filter, &update, true).unwrap();
        assert_eq!(res, UpdateResult { matched_count: 1, modified_count: 1 });
    }

    #[test]
    fn update_without_match_is_a_noop() {
        let mut c = collection();
        c.insert(doc! { "_id": 1 }).unwrap();
        let filter = Filter::parse(&doc! { "_id": 20 }).unwrap();
        let update = Update::parse(&doc! { "$set": { "species": "NA" } }).unwrap();
        let res = c.update(&filter, &update, false).unwrap();
        assert_eq!(res, UpdateResult::default());
    }

    #[test]
    fn failed_update_leaves_document_untouched() {
        let mut c = collection();
        c.insert(doc! { "_id": 1, "a": 1, "s": "x" }).unwrap();
        let filter = Filter::parse(&doc! {}).unwrap();
        let update = Update::parse(&doc! { "$inc": { "a": 1, "s": 1 } }).unwrap();
        assert!(c.update(&filter, &update, false).is_err());
        assert_eq!(c.get(&Bson::Int32(1)).unwrap().get_i32("a").unwrap(), 1);
    }

    #[test]
    fn deletes() {
        let mut c = collection();
        c.insert_many(vec![
            doc! { "_id": 1, "sepalLength": 4.4 },
            doc! { "_id": 2, "sepalLength": 5.0 },
            doc! { "_id": 3, "sepalLength": 4.4 },
            doc! { "_id": 4, "sepalLength": 4.4 },
        ])
        .unwrap();

        let one = Filter::parse(&doc! { "_id": 3 }).unwrap();
        assert_eq!(c.delete(&one, false).deleted_count, 1);
        assert_eq!(c.delete(&one, false).deleted_count, 0);

        let many = Filter::parse(&doc! { "sepalLength": 4.4 }).unwrap();
        assert_eq!(c.count(&many), 2);
        assert_eq!(c.delete(&many, true).deleted_count, 2);
        assert_eq!(find_all(&c), vec![doc! { "_id": 2, "sepalLength": 5.0 }]);

        assert_eq!(c.clear().deleted_count, 1);
        assert!(c.is_empty());
    }
}
