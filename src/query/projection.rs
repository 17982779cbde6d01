use bson::Document;

use crate::error::{Result, StoreError};
use crate::query::value::truthy;
use crate::storage::record::ID_FIELD;

/// A compiled field projection.
///
/// Either lists the fields to keep (`{ "species": 1, "sepalLength": 1 }`)
/// or the fields to drop (`{ "species": 0 }`). `_id` is kept unless it is
/// explicitly switched off, in either mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    mode: Mode,
    fields: Vec<String>,
    include_id: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Include,
    Exclude,
}

impl Projection {
    /// Compiles a projection document.
    pub fn parse(spec: &Document) -> Result<Self> {
        let mut include_id = true;
        let mut mode = None;
        let mut fields = Vec::with_capacity(spec.len());

        for (field, value) in spec {
            let keep = truthy(value).ok_or_else(|| {
                StoreError::InvalidProjection(format!(
                    "value for {:?} must be a number or boolean, got {}",
                    field, value
                ))
            })?;
            if field == ID_FIELD {
                include_id = keep;
                continue;
            }
            if field.contains('.') || field.starts_with('$') {
                return Err(StoreError::InvalidProjection(format!(
                    "only top-level field names are supported, got {:?}",
                    field
                )));
            }
            let this = if keep { Mode::Include } else { Mode::Exclude };
            match mode {
                Some(m) if m != this => {
                    return Err(StoreError::InvalidProjection(format!(
                        "cannot mix inclusion and exclusion (at {:?})",
                        field
                    )))
                }
                _ => mode = Some(this),
            }
            fields.push(field.clone());
        }

        // A projection that only mentions `_id` either keeps just the id
        // or drops just the id.
        let mode = mode.unwrap_or(if include_id && !spec.is_empty() {
            Mode::Include
        } else {
            Mode::Exclude
        });

        Ok(Projection {
            mode,
            fields,
            include_id,
        })
    }

    /// Applies the projection, keeping the document's field order.
    pub fn apply(&self, doc: Document) -> Document {
        doc.into_iter()
            .filter(|(key, _)| self.keeps(key))
            .collect()
    }

    fn keeps(&self, key: &str) -> bool {
        if key == ID_FIELD {
            return self.include_id;
        }
        let listed = self.fields.iter().any(|f| f == key);
        match self.mode {
            Mode::Include => listed,
            Mode::Exclude => !listed,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bson::doc;

    fn iris() -> Document {
        doc! {
            "_id": 7,
            "sepalLength": 4.6,
            "sepalWidth": 3.4,
            "petalLength": 1.4,
            "petalWidth": 0.3,
            "species": "setosa",
        }
    }

    #[test]
    fn inclusion_without_id() {
        let p = Projection::parse(&doc! { "species": 1, "_id": 0, "sepalLength": 1 }).unwrap();
        let out = p.apply(iris());
        assert_eq!(out, doc! { "sepalLength": 4.6, "species": "setosa" });
        assert_eq!(out.len(), 2);
        assert!(!out.contains_key("_id"));
    }

    #[test]
    fn inclusion_keeps_id_by_default() {
        let p = Projection::parse(&doc! { "species": true }).unwrap();
        assert_eq!(p.apply(iris()), doc! { "_id": 7, "species": "setosa" });
    }

    #[test]
    fn exclusion() {
        let p = Projection::parse(&doc! { "sepalWidth": 0, "petalWidth": 0 }).unwrap();
        assert_eq!(
            p.apply(iris()),
            doc! { "_id": 7, "sepalLength": 4.6, "petalLength": 1.4, "species": "setosa" }
        );
    }

    #[test]
    fn id_only() {
        let p = Projection::parse(&doc! { "_id": 0 }).unwrap();
        let out = p.apply(iris());
        assert_eq!(out.len(), 5);
        assert!(!out.contains_key("_id"));

        let p = Projection::parse(&doc! { "_id": 1 }).unwrap();
        assert_eq!(p.apply(iris()), doc! { "_id": 7 });
    }

    #[test]
    fn empty_projection_keeps_everything() {
        let p = Projection::parse(&doc! {}).unwrap();
        assert_eq!(p.apply(iris()), iris());
    }

    #[test]
    fn mixed_modes_are_rejected() {
        let err = Projection::parse(&doc! { "species": 1, "sepalWidth": 0 }).unwrap_err();
        assert!(matches!(err, StoreError::InvalidProjection(_)));
        let err = Projection::parse(&doc! { "species": "yes" }).unwrap_err();
        assert!(matches!(err, StoreError::InvalidProjection(_)));
    }
}
