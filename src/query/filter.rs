use bson::{Bson, Document};
use std::cmp::Ordering;

use crate::error::{Result, StoreError};
use crate::query::value::{compare, get_path, truthy, type_rank, values_equal};
use crate::storage::record::{DocKey, ID_FIELD};

/// A compiled query filter.
///
/// Built from a filter document such as `{ "sepalLength": 4.4 }` or
/// `{ "_id": { "$gte": 10 }, "species": { "$in": ["setosa"] } }`. The
/// empty document matches everything.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Field { path: String, cond: Condition },
}

/// A condition on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Bson),
    Ne(Bson),
    Gt(Bson),
    Gte(Bson),
    Lt(Bson),
    Lte(Bson),
    In(Vec<Bson>),
    Nin(Vec<Bson>),
    Exists(bool),
    All(Vec<Condition>),
}

impl Filter {
    /// Compiles a filter document.
    pub fn parse(doc: &Document) -> Result<Self> {
        let mut clauses = Vec::with_capacity(doc.len());
        for (key, value) in doc {
            let clause = match key.as_str() {
                "$and" => Filter::And(parse_clause_list(key, value)?),
                "$or" => Filter::Or(parse_clause_list(key, value)?),
                "$nor" => Filter::Nor(parse_clause_list(key, value)?),
                op if op.starts_with('$') => {
                    return Err(StoreError::InvalidFilter(format!(
                        "unknown top-level operator {}",
                        op
                    )))
                }
                path => Filter::Field {
                    path: path.to_string(),
                    cond: Condition::parse(value)?,
                },
            };
            clauses.push(clause);
        }
        if clauses.len() == 1 {
            return Ok(clauses.remove(0));
        }
        Ok(Filter::And(clauses))
    }

    /// Checks whether a document satisfies the filter.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::And(all) => all.iter().all(|f| f.matches(doc)),
            Filter::Or(any) => any.iter().any(|f| f.matches(doc)),
            Filter::Nor(none) => !none.iter().any(|f| f.matches(doc)),
            Filter::Field { path, cond } => cond.matches(get_path(doc, path)),
        }
    }

    /// If the filter is a plain equality on `_id`, returns the key it
    /// selects so the caller can use the key index instead of a scan.
    pub fn id_lookup(&self) -> Option<DocKey> {
        match self {
            Filter::Field {
                path,
                cond: Condition::Eq(value),
            } if path == ID_FIELD => match value {
                Bson::Document(_) | Bson::Array(_) | Bson::Null | Bson::Undefined => None,
                v => Some(DocKey::from_bson(v)),
            },
            _ => None,
        }
    }
}

fn parse_clause_list(op: &str, value: &Bson) -> Result<Vec<Filter>> {
    let items = match value {
        Bson::Array(items) if !items.is_empty() => items,
        _ => {
            return Err(StoreError::InvalidFilter(format!(
                "{} needs a non-empty array",
                op
            )))
        }
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => Filter::parse(d),
            other => Err(StoreError::InvalidFilter(format!(
                "{} entries must be documents, got {}",
                op, other
            ))),
        })
        .collect()
}

fn operand_list(op: &str, value: &Bson) -> Result<Vec<Bson>> {
    match value {
        Bson::Array(items) => Ok(items.clone()),
        _ => Err(StoreError::InvalidFilter(format!("{} needs an array", op))),
    }
}

impl Condition {
    /// Compiles the value paired with a field in a filter document.
    ///
    /// A document whose keys are all operators is an operator expression;
    /// anything else is matched by equality.
    pub fn parse(value: &Bson) -> Result<Self> {
        let ops = match value {
            Bson::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')) => d,
            literal => return Ok(Condition::Eq(literal.clone())),
        };

        let mut conds = Vec::with_capacity(ops.len());
        for (op, operand) in ops {
            let cond = match op.as_str() {
                "$eq" => Condition::Eq(operand.clone()),
                "$ne" => Condition::Ne(operand.clone()),
                "$gt" => Condition::Gt(operand.clone()),
                "$gte" => Condition::Gte(operand.clone()),
                "$lt" => Condition::Lt(operand.clone()),
                "$lte" => Condition::Lte(operand.clone()),
                "$in" => Condition::In(operand_list(op, operand)?),
                "$nin" => Condition::Nin(operand_list(op, operand)?),
                "$exists" => Condition::Exists(truthy(operand).ok_or_else(|| {
                    StoreError::InvalidFilter("$exists needs a boolean".to_string())
                })?),
                other if other.starts_with('$') => {
                    return Err(StoreError::InvalidFilter(format!(
                        "unknown operator {}",
                        other
                    )))
                }
                other => {
                    return Err(StoreError::InvalidFilter(format!(
                        "cannot mix operators and field {:?} in one expression",
                        other
                    )))
                }
            };
            conds.push(cond);
        }
        if conds.len() == 1 {
            return Ok(conds.remove(0));
        }
        Ok(Condition::All(conds))
    }

    /// Checks the condition against a field value (`None` if absent).
    pub fn matches(&self, value: Option<&Bson>) -> bool {
        match self {
            Condition::Eq(target) => equals(value, target),
            Condition::Ne(target) => !equals(value, target),
            Condition::Gt(target) => ordered(value, target, |o| o == Ordering::Greater),
            Condition::Gte(target) => ordered(value, target, |o| o != Ordering::Less),
            Condition::Lt(target) => ordered(value, target, |o| o == Ordering::Less),
            Condition::Lte(target) => ordered(value, target, |o| o != Ordering::Greater),
            Condition::In(targets) => targets.iter().any(|t| equals(value, t)),
            Condition::Nin(targets) => !targets.iter().any(|t| equals(value, t)),
            Condition::Exists(want) => value.is_some() == *want,
            Condition::All(conds) => conds.iter().all(|c| c.matches(value)),
        }
    }
}

/// Equality with the usual document-store conveniences: a missing field
/// equals null, and an array field matches if any element does.
fn equals(value: Option<&Bson>, target: &Bson) -> bool {
    match value {
        None => matches!(target, Bson::Null),
        Some(v) => {
            if values_equal(v, target) {
                return true;
            }
            match v {
                Bson::Array(items) => items.iter().any(|item| values_equal(item, target)),
                _ => false,
            }
        }
    }
}

/// Range comparison; values of different types never match.
fn ordered(value: Option<&Bson>, target: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    match value {
        Some(v) if type_rank(v) == type_rank(target) => accept(compare(v, target)),
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| type_rank(item) == type_rank(target) && accept(compare(item, target))),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bson::doc;

    fn iris() -> Document {
        doc! {
            "_id": 20,
            "sepalLength": 4.4,
            "sepalWidth": 2.9,
            "petalLength": 1.4,
            "petalWidth": 0.2,
            "species": "setosa",
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = Filter::parse(&doc! {}).unwrap();
        assert!(f.matches(&iris()));
        assert!(f.matches(&doc! {}));
    }

    #[test]
    fn literal_equality() {
        let f = Filter::parse(&doc! { "sepalLength": 4.4 }).unwrap();
        assert!(f.matches(&iris()));
        let f = Filter::parse(&doc! { "sepalLength": 4.5 }).unwrap();
        assert!(!f.matches(&iris()));
        let f = Filter::parse(&doc! { "species": "setosa", "_id": 20_i64 }).unwrap();
        assert!(f.matches(&iris()));
    }

    #[test]
    fn missing_field_equals_null() {
        let f = Filter::parse(&doc! { "color": null }).unwrap();
        assert!(f.matches(&iris()));
        let f = Filter::parse(&doc! { "color": { "$exists": true } }).unwrap();
        assert!(!f.matches(&iris()));
    }

    #[test]
    fn comparison_operators() {
        let f = Filter::parse(&doc! { "sepalLength": { "$gt": 4, "$lte": 4.4 } }).unwrap();
        assert!(f.matches(&iris()));
        let f = Filter::parse(&doc! { "sepalLength": { "$lt": 4.4 } }).unwrap();
        assert!(!f.matches(&iris()));
        // Strings never compare to numbers...
        let f = Filter::parse(&doc! { "species": { "$gt": 1 } }).unwrap();
        assert!(!f.matches(&iris()));
    }

    #[test]
    fn membership_operators() {
        let f = Filter::parse(&doc! { "species": { "$in": ["virginica", "setosa"] } }).unwrap();
        assert!(f.matches(&iris()));
        let f = Filter::parse(&doc! { "species": { "$nin": ["setosa"] } }).unwrap();
        assert!(!f.matches(&iris()));
        let f = Filter::parse(&doc! { "species": { "$ne": "NA" } }).unwrap();
        assert!(f.matches(&iris()));
    }

    #[test]
    fn logical_operators() {
        let f = Filter::parse(&doc! {
            "$or": [ { "species": "NA" }, { "_id": 20 } ]
        })
        .unwrap();
        assert!(f.matches(&iris()));
        let f = Filter::parse(&doc! {
            "$nor": [ { "species": "setosa" } ]
        })
        .unwrap();
        assert!(!f.matches(&iris()));
    }

    #[test]
    fn array_fields_match_any_element() {
        let d = doc! { "tags": ["a", "b"] };
        assert!(Filter::parse(&doc! { "tags": "b" }).unwrap().matches(&d));
        assert!(!Filter::parse(&doc! { "tags": "c" }).unwrap().matches(&d));
    }

    #[test]
    fn invalid_filters_are_rejected() {
        assert!(matches!(
            Filter::parse(&doc! { "a": { "$regex": "x" } }),
            Err(StoreError::InvalidFilter(_))
        ));
        assert!(matches!(
            Filter::parse(&doc! { "$where": "true" }),
            Err(StoreError::InvalidFilter(_))
        ));
        assert!(matches!(
            Filter::parse(&doc! { "$or": [] }),
            Err(StoreError::InvalidFilter(_))
        ));
        assert!(matches!(
            Filter::parse(&doc! { "a": { "$in": 3 } }),
            Err(StoreError::InvalidFilter(_))
        ));
    }

    #[test]
    fn id_lookup_only_for_plain_equality() {
        let f = Filter::parse(&doc! { "_id": 20 }).unwrap();
        assert_eq!(f.id_lookup(), Some(DocKey::Int(20)));
        let f = Filter::parse(&doc! { "_id": { "$gt": 20 } }).unwrap();
        assert_eq!(f.id_lookup(), None);
        let f = Filter::parse(&doc! { "_id": 20, "species": "setosa" }).unwrap();
        assert_eq!(f.id_lookup(), None);
    }
}
