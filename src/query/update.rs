use bson::{Bson, Document};

use crate::error::{Result, StoreError};
use crate::storage::record::ID_FIELD;

/// A compiled update made of field-level operators.
///
/// Updates merge into the stored document; they never replace it.
/// Supported operators are `$set`, `$unset` and `$inc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

#[derive(Debug, Clone, PartialEq)]
enum UpdateOp {
    Set(String, Bson),
    Unset(String),
    Inc(String, Bson),
}

impl Update {
    /// Compiles an update document such as `{ "$set": { "species": "NA" } }`.
    pub fn parse(doc: &Document) -> Result<Self> {
        if doc.is_empty() {
            return Err(StoreError::InvalidUpdate(
                "update document is empty".to_string(),
            ));
        }
        let mut ops = vec![];
        for (op, fields) in doc {
            let fields = match fields {
                Bson::Document(d) => d,
                _ if !op.starts_with('$') => {
                    return Err(StoreError::InvalidUpdate(format!(
                        "expected an update operator, got field {:?}",
                        op
                    )))
                }
                other => {
                    return Err(StoreError::InvalidUpdate(format!(
                        "{} needs a document, got {}",
                        op, other
                    )))
                }
            };
            for (path, value) in fields {
                check_path(path)?;
                let parsed = match op.as_str() {
                    "$set" => UpdateOp::Set(path.clone(), value.clone()),
                    "$unset" => UpdateOp::Unset(path.clone()),
                    "$inc" => match value {
                        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
                            UpdateOp::Inc(path.clone(), value.clone())
                        }
                        other => {
                            return Err(StoreError::InvalidUpdate(format!(
                                "$inc needs a number for {:?}, got {}",
                                path, other
                            )))
                        }
                    },
                    other => {
                        return Err(StoreError::InvalidUpdate(format!(
                            "unknown update operator {:?}",
                            other
                        )))
                    }
                };
                ops.push(parsed);
            }
        }
        Ok(Update { ops })
    }

    /// Applies the update to a document.
    ///
    /// Returns whether the document changed. On error the document may be
    /// partially modified, so callers should apply to a copy.
    pub fn apply(&self, doc: &mut Document) -> Result<bool> {
        let mut changed = false;
        for op in &self.ops {
            changed |= match op {
                UpdateOp::Set(path, value) => set_path(doc, path, value.clone())?,
                UpdateOp::Unset(path) => unset_path(doc, path),
                UpdateOp::Inc(path, by) => inc_path(doc, path, by)?,
            };
        }
        Ok(changed)
    }
}

fn check_path(path: &str) -> Result<()> {
    if path.is_empty() || path.split('.').any(|s| s.is_empty()) {
        return Err(StoreError::InvalidUpdate(format!(
            "invalid field path {:?}",
            path
        )));
    }
    if path == ID_FIELD || path.starts_with("_id.") {
        return Err(StoreError::InvalidUpdate(
            "the _id field cannot be modified".to_string(),
        ));
    }
    Ok(())
}

/// Walks to the document holding the last segment of `path`, creating
/// intermediate documents when `create` is set.
fn parent_mut<'a>(
    doc: &'a mut Document,
    path: &'a str,
    create: bool,
) -> Result<Option<(&'a mut Document, &'a str)>> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    let mut current = doc;
    if let Some(parents) = parents {
        for segment in parents.split('.') {
            if !current.contains_key(segment) {
                if !create {
                    return Ok(None);
                }
                current.insert(segment, Document::new());
            }
            current = match current.get_mut(segment) {
                Some(Bson::Document(inner)) => inner,
                _ if !create => return Ok(None),
                _ => {
                    return Err(StoreError::InvalidUpdate(format!(
                        "cannot create field {:?}: {:?} is not a document",
                        path, segment
                    )))
                }
            };
        }
    }
    Ok(Some((current, leaf)))
}

fn set_path(doc: &mut Document, path: &str, value: Bson) -> Result<bool> {
    let Some((parent, leaf)) = parent_mut(doc, path, true)? else {
        return Ok(false);
    };
    if parent.get(leaf) == Some(&value) {
        return Ok(false);
    }
    parent.insert(leaf, value);
    Ok(true)
}

fn unset_path(doc: &mut Document, path: &str) -> bool {
    match parent_mut(doc, path, false) {
        Ok(Some((parent, leaf))) => parent.remove(leaf).is_some(),
        _ => false,
    }
}

fn inc_path(doc: &mut Document, path: &str, by: &Bson) -> Result<bool> {
    let Some((parent, leaf)) = parent_mut(doc, path, true)? else {
        return Ok(false);
    };
    let next = match parent.get(leaf) {
        None => by.clone(),
        Some(current) => add(current, by).ok_or_else(|| {
            StoreError::InvalidUpdate(format!(
                "cannot $inc non-numeric field {:?} ({})",
                path, current
            ))
        })?,
    };
    let changed = parent.get(leaf) != Some(&next);
    parent.insert(leaf, next);
    Ok(changed)
}

fn add(a: &Bson, b: &Bson) -> Option<Bson> {
    Some(match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => match x.checked_add(*y) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*x) + i64::from(*y)),
        },
        (Bson::Int32(x), Bson::Int64(y)) => Bson::Int64(i64::from(*x).checked_add(*y)?),
        (Bson::Int64(x), Bson::Int32(y)) => Bson::Int64(x.checked_add(i64::from(*y))?),
        (Bson::Int64(x), Bson::Int64(y)) => Bson::Int64(x.checked_add(*y)?),
        (Bson::Double(x), other) | (other, Bson::Double(x)) => Bson::Double(
            x + match other {
                Bson::Int32(n) => f64::from(*n),
                Bson::Int64(n) => *n as f64,
                Bson::Double(f) => *f,
                _ => return None,
            },
        ),
        _ => return None,
    })
}
