use bson::Document;
use std::future::{Future, IntoFuture};
use std::pin::Pin;

use crate::client::CollectionRef;
use crate::error::Result;
use crate::query::sort::SortOrder;
use crate::query::FindOptions;

/// A pending find, configured by chaining and run with `.await`.
///
/// ```ignore
/// let top = iris
///     .find(doc! {})
///     .sort("sepalLength", SortOrder::Descending)
///     .limit(1)
///     .await?;
/// ```
#[must_use = "a find does nothing until it is awaited"]
pub struct Find<'a> {
    coll: &'a CollectionRef,
    filter: Document,
    options: FindOptions,
}

impl<'a> Find<'a> {
    pub(crate) fn new(coll: &'a CollectionRef, filter: Document) -> Self {
        Find {
            coll,
            filter,
            options: FindOptions::default(),
        }
    }

    /// Keeps (`1`) or drops (`0`) the named fields in each result.
    pub fn projection(mut self, projection: Document) -> Self {
        self.options.projection = Some(projection);
        self
    }

    /// Sorts by a field. Later calls add lower-priority keys.
    pub fn sort(mut self, field: &str, order: SortOrder) -> Self {
        self.options
            .sort
            .get_or_insert_with(Document::new)
            .insert(field, order.as_i32());
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.options.skip = n;
        self
    }

    /// Caps the number of results; `0` means no limit.
    pub fn limit(mut self, n: u64) -> Self {
        self.options.limit = n;
        self
    }

    /// The options this find will be sent with.
    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    /// Runs the query and returns a cursor over its results.
    pub async fn run(self) -> Result<Cursor> {
        let docs = self
            .coll
            .store()
            .find(self.coll.namespace(), self.filter, self.options)
            .await?;
        Ok(Cursor::new(docs))
    }
}

impl<'a> IntoFuture for Find<'a> {
    type Output = Result<Cursor>;
    type IntoFuture = Pin<Box<dyn Future<Output = Result<Cursor>> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

/// The results of one find, yielded in order.
///
/// A cursor is consumed as it is iterated; run the find again for a
/// fresh one.
#[derive(Debug)]
pub struct Cursor {
    docs: std::vec::IntoIter<Document>,
}

impl Cursor {
    fn new(docs: Vec<Document>) -> Self {
        Cursor {
            docs: docs.into_iter(),
        }
    }
}

impl Iterator for Cursor {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        self.docs.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.docs.size_hint()
    }
}

impl ExactSizeIterator for Cursor {}
