use bson::oid::ObjectId;
use bson::{Bson, Document};
use std::fmt;

/// The name of the field holding a document's unique identifier.
pub const ID_FIELD: &str = "_id";

/// A record stored in a [super::memtable::MemTable].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The record's unique key, derived from its `_id`.
    pub key: DocKey,

    /// The record's value.
    pub value: Document,
}

/// A hashable, totally ordered form of an `_id` value.
///
/// BSON values can't be used as map keys directly: doubles aren't `Eq`
/// and numbers of different widths must still collide (`20`, `20i64`
/// and `20.0` identify the same document). Integral numbers are folded
/// into [DocKey::Int]; everything without a natural key form falls back
/// to its extended JSON rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocKey {
    Null,
    Int(i64),
    /// A non-integral double, stored as its bit pattern.
    Float(u64),
    Str(String),
    ObjectId(ObjectId),
    Bool(bool),
    Other(String),
}

impl DocKey {
    /// Builds the key for an `_id` value.
    pub fn from_bson(value: &Bson) -> Self {
        match value {
            Bson::Null | Bson::Undefined => DocKey::Null,
            Bson::Int32(n) => DocKey::Int(i64::from(*n)),
            Bson::Int64(n) => DocKey::Int(*n),
            Bson::Double(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    DocKey::Int(*f as i64)
                } else {
                    DocKey::Float(f.to_bits())
                }
            }
            Bson::String(s) => DocKey::Str(s.clone()),
            Bson::ObjectId(oid) => DocKey::ObjectId(*oid),
            Bson::Boolean(b) => DocKey::Bool(*b),
            other => DocKey::Other(other.clone().into_relaxed_extjson().to_string()),
        }
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocKey::Null => write!(f, "null"),
            DocKey::Int(n) => write!(f, "{}", n),
            DocKey::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            DocKey::Str(s) => write!(f, "{:?}", s),
            DocKey::ObjectId(oid) => write!(f, "ObjectId({})", oid),
            DocKey::Bool(b) => write!(f, "{}", b),
            DocKey::Other(s) => write!(f, "{}", s),
        }
    }
}
