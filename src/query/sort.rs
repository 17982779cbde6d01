use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{Result, StoreError};
use crate::query::value::{compare, get_path};

/// The direction of a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// The conventional numeric form (`1` or `-1`).
    pub fn as_i32(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }

    fn from_bson(field: &str, value: &Bson) -> Result<Self> {
        let n = match value {
            Bson::Int32(n) => i64::from(*n),
            Bson::Int64(n) => *n,
            Bson::Double(f) if f.fract() == 0.0 => *f as i64,
            _ => 0,
        };
        match n {
            1 => Ok(SortOrder::Ascending),
            -1 => Ok(SortOrder::Descending),
            _ => Err(StoreError::InvalidSort(format!(
                "sort direction for {:?} must be 1 or -1, got {}",
                field, value
            ))),
        }
    }
}

/// An ordered list of sort keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec {
    keys: Vec<(String, SortOrder)>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key; earlier keys take precedence.
    pub fn then(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.keys.push((field.into(), order));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parses a sort document such as `{ "sepalLength": -1 }`.
    pub fn parse(doc: &Document) -> Result<Self> {
        let mut spec = SortSpec::new();
        for (field, value) in doc {
            spec = spec.then(field.clone(), SortOrder::from_bson(field, value)?);
        }
        Ok(spec)
    }

    /// The sort document form of this spec.
    pub fn to_document(&self) -> Document {
        self.keys
            .iter()
            .map(|(field, order)| (field.clone(), Bson::Int32(order.as_i32())))
            .collect()
    }

    /// Compares two documents under this spec. Missing fields sort as null.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, order) in &self.keys {
            let va = get_path(a, field).unwrap_or(&Bson::Null);
            let vb = get_path(b, field).unwrap_or(&Bson::Null);
            let ord = match order {
                SortOrder::Ascending => compare(va, vb),
                SortOrder::Descending => compare(vb, va),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Sorts documents in place. The sort is stable, so ties keep their
    /// insertion order.
    pub fn sort(&self, docs: &mut [Document]) {
        if self.is_empty() {
            return;
        }
        docs.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bson::doc;

    #[test]
    fn descending_by_field() {
        let mut docs = vec![
            doc! { "_id": 1, "sepalLength": 5.1 },
            doc! { "_id": 2, "sepalLength": 7.9 },
            doc! { "_id": 3, "sepalLength": 4.3 },
            doc! { "_id": 4, "sepalLength": 7.9 },
        ];
        SortSpec::new()
            .then("sepalLength", SortOrder::Descending)
            .sort(&mut docs);
        let ids: Vec<i32> = docs.iter().map(|d| d.get_i32("_id").unwrap()).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn secondary_keys_break_ties() {
        let mut docs = vec![
            doc! { "species": "b", "n": 1 },
            doc! { "species": "a", "n": 1 },
            doc! { "species": "a", "n": 2 },
        ];
        SortSpec::new()
            .then("species", SortOrder::Ascending)
            .then("n", SortOrder::Descending)
            .sort(&mut docs);
        assert_eq!(docs[0], doc! { "species": "a", "n": 2 });
        assert_eq!(docs[1], doc! { "species": "a", "n": 1 });
        assert_eq!(docs[2], doc! { "species": "b", "n": 1 });
    }

    #[test]
    fn missing_fields_sort_first_ascending() {
        let mut docs = vec![doc! { "x": 1 }, doc! {}];
        SortSpec::new().then("x", SortOrder::Ascending).sort(&mut docs);
        assert_eq!(docs[0], doc! {});
    }

    #[test]
    fn parse_and_render() {
        let spec = SortSpec::parse(&doc! { "sepalLength": -1, "_id": 1 }).unwrap();
        assert_eq!(spec.to_document(), doc! { "sepalLength": -1, "_id": 1 });
        assert!(SortSpec::parse(&doc! { "sepalLength": 0 }).is_err());
        assert!(SortSpec::parse(&doc! { "sepalLength": "desc" }).is_err());
    }
}
