//! The query language: filters, projections, sorting and updates.

pub mod filter;
pub mod projection;
pub mod sort;
pub mod update;
pub mod value;

use bson::Document;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use filter::Filter;
use projection::Projection;
use sort::SortSpec;

/// Options for a find operation, in the form sent over the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    /// Fields to include or exclude from each result.
    pub projection: Option<Document>,

    /// Sort document, e.g. `{ "sepalLength": -1 }`.
    pub sort: Option<Document>,

    /// Number of matching documents to skip.
    #[serde(default)]
    pub skip: u64,

    /// Maximum number of documents to return; `0` means no limit.
    #[serde(default)]
    pub limit: u64,
}

/// A compiled find: filter, then sort, skip and limit, then projection.
#[derive(Debug, Clone)]
pub struct FindPlan {
    pub filter: Filter,
    projection: Option<Projection>,
    sort: SortSpec,
    skip: usize,
    limit: usize,
}

impl FindPlan {
    /// Compiles a filter document and find options.
    pub fn compile(filter: &Document, options: &FindOptions) -> Result<Self> {
        let projection = options
            .projection
            .as_ref()
            .map(Projection::parse)
            .transpose()?;
        let sort = match &options.sort {
            Some(doc) => SortSpec::parse(doc)?,
            None => SortSpec::new(),
        };
        Ok(FindPlan {
            filter: Filter::parse(filter)?,
            projection,
            sort,
            skip: usize::try_from(options.skip).unwrap_or(usize::MAX),
            limit: usize::try_from(options.limit).unwrap_or(usize::MAX),
        })
    }

    /// Runs the plan over documents given in their natural order.
    pub fn execute<'a>(&self, docs: impl Iterator<Item = &'a Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs
            .filter(|doc| self.filter.matches(doc))
            .cloned()
            .collect();
        self.sort.sort(&mut matched);

        let limit = if self.limit == 0 { usize::MAX } else { self.limit };
        matched
            .into_iter()
            .skip(self.skip)
            .take(limit)
            .map(|doc| match &self.projection {
                Some(p) => p.apply(doc),
                None => doc,
            })
            .collect()
    }
}
