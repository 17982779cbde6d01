//! A narrated tour of the basic CRUD operations, run against the iris
//! dataset.
//!
//! [run] performs every step in order, writes a line or two of narration
//! after each one and returns a [WalkthroughReport] holding what each
//! step produced. The first failure ends the tour.

use anyhow::{bail, Context, Result};
use bson::{doc, Bson, Document};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::client::{Client, DeleteResult, SortOrder, UpdateResult};
use crate::config::{DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_DATASET};
use crate::dataset;
use crate::storage::record::ID_FIELD;

/// The field the scans sort on.
pub const SORT_FIELD: &str = "sepalLength";

/// The categorical field the update rewrites.
pub const SPECIES_FIELD: &str = "species";

/// The `_id` of the record that is updated and then deleted.
pub const TARGET_ID: i64 = 20;

/// The species written by the update.
pub const UPDATED_SPECIES: &str = "NA";

/// Records with this sepal length are removed by the bulk delete.
pub const DELETED_SEPAL_LENGTH: f64 = 4.4;

/// How the batch of records after the first gets its `_id`s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdAssignment {
    /// Records after the first are numbered from 1, and the batch insert
    /// then skips the first numbered record too. With `n` records loaded,
    /// ids `2..n` are inserted and id 1 never is.
    #[default]
    Legacy,

    /// Every numbered record is inserted (ids `1..n`).
    Contiguous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkthroughConfig {
    pub dataset: PathBuf,
    pub database: String,
    pub collection: String,
    pub id_assignment: IdAssignment,
}

impl Default for WalkthroughConfig {
    fn default() -> Self {
        WalkthroughConfig {
            dataset: PathBuf::from(DEFAULT_DATASET),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            id_assignment: IdAssignment::default(),
        }
    }
}

/// What each step of the walkthrough produced.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkthroughReport {
    /// Number of records read from the dataset.
    pub loaded: usize,
    /// Whether step 2 created the collection rather than finding it.
    pub created_collection: bool,
    /// The store-generated id of the first record.
    pub first_id: Bson,
    /// The ids handed out to the records after the first, in order.
    pub assigned_ids: Vec<Bson>,
    /// Collection names once the first record is in.
    pub collections_after_insert: Vec<String>,
    /// The ids returned by the batch insert.
    pub batch_ids: Vec<Bson>,
    pub all_records: Vec<Document>,
    /// Species and sepal length only, without ids.
    pub projected: Vec<Document>,
    /// As `projected`, by descending sepal length.
    pub sorted_projected: Vec<Document>,
    pub update: UpdateResult,
    /// The target record right after the update, if it exists.
    pub updated_record: Option<Document>,
    /// The record with the greatest sepal length.
    pub top_record: Option<Document>,
    pub deleted_target: DeleteResult,
    pub count_before_deletion: usize,
    pub count_after_deletion: usize,
    pub emptied: DeleteResult,
    pub collections_after_drop: Vec<String>,
}

/// Numbers the records after the first one: the record at offset `i` of
/// that tail gets `_id = i + 1`.
pub fn assign_sequential_ids(records: &[Document]) -> Vec<Document> {
    records
        .iter()
        .skip(1)
        .enumerate()
        .map(|(idx, record)| {
            let mut record = record.clone();
            record.insert(ID_FIELD, (idx + 1) as i64);
            record
        })
        .collect()
}

/// Picks the numbered records that go into the batch insert.
pub fn batch_records(numbered: Vec<Document>, mode: IdAssignment) -> Vec<Document> {
    match mode {
        IdAssignment::Legacy => numbered.into_iter().skip(1).collect(),
        IdAssignment::Contiguous => numbered,
    }
}

fn id_list(ids: &[Bson]) -> String {
    let ids: Vec<String> = ids.iter().map(Bson::to_string).collect();
    format!("[{}]", ids.join(", "))
}

/// Runs the walkthrough against `client`, narrating to `out`.
pub async fn run<W: Write>(
    client: &Client,
    config: &WalkthroughConfig,
    out: &mut W,
) -> Result<WalkthroughReport> {
    // 1. Load the dataset...
    let records = dataset::load(&config.dataset).await?;
    info!(step = 1, records = records.len(), "loaded dataset");
    let Some(first) = records.first().cloned() else {
        bail!("dataset {:?} holds no records", config.dataset);
    };

    // 2. Resolve the database and collection, creating them if needed...
    let db = client.database(&config.database);
    let (iris, created) = db
        .create_collection(&config.collection)
        .await
        .with_context(|| format!("failed to open collection {}", config.collection))?;
    info!(step = 2, ns = %iris.namespace(), created, "opened collection");

    // 3. Insert the first record as-is and let the store pick its id...
    let first_id = iris
        .insert_one(first)
        .await
        .context("failed to insert the first record")?
        .inserted_id;
    info!(step = 3, id = %first_id, "inserted first record");
    writeln!(out, "The id for first inserted document is: {}", first_id)?;

    // 4. Number the rest...
    let numbered = assign_sequential_ids(&records);
    let assigned_ids: Vec<Bson> = numbered
        .iter()
        .filter_map(|r| r.get(ID_FIELD).cloned())
        .collect();
    info!(step = 4, assigned = assigned_ids.len(), "assigned sequential ids");

    // 5. The collection now exists...
    let collections_after_insert = db
        .list_collection_names()
        .await
        .context("failed to list collections")?;
    info!(step = 5, collections = ?collections_after_insert, "listed collections");
    writeln!(out, "{:?}", collections_after_insert)?;
    if created {
        writeln!(out, "Collection {} was created by this run.", iris.namespace())?;
    } else {
        writeln!(out, "Collection {} already existed.", iris.namespace())?;
    }

    // 6. Insert the numbered records in one batch...
    if config.id_assignment == IdAssignment::Legacy {
        debug!("legacy id assignment: the record numbered 1 is left out of the batch");
    }
    let batch = batch_records(numbered, config.id_assignment);
    let batch_ids = iris
        .insert_many(batch)
        .await
        .context("failed to insert the batch")?
        .inserted_ids;
    info!(step = 6, inserted = batch_ids.len(), "inserted batch");
    writeln!(
        out,
        "The ids for all inserted documents are:\n{}",
        id_list(&batch_ids)
    )?;

    // 7. Everything in the collection...
    let all_records: Vec<Document> = iris.find(doc! {}).await?.collect();
    info!(step = 7, records = all_records.len(), "scanned collection");
    for record in &all_records {
        writeln!(out, "{}", record)?;
    }

    // 8. Only the species and sepal length...
    let projection = doc! { SPECIES_FIELD: 1, ID_FIELD: 0, SORT_FIELD: 1 };
    let projected: Vec<Document> = iris
        .find(doc! {})
        .projection(projection.clone())
        .await?
        .collect();
    info!(step = 8, records = projected.len(), "projected scan");
    for record in &projected {
        writeln!(out, "{}", record)?;
    }

    // 9. ...sorted by sepal length, longest first...
    let sorted_projected: Vec<Document> = iris
        .find(doc! {})
        .projection(projection)
        .sort(SORT_FIELD, SortOrder::Descending)
        .await?
        .collect();
    info!(step = 9, records = sorted_projected.len(), "sorted projected scan");
    for record in &sorted_projected {
        writeln!(out, "{}", record)?;
    }

    // 10. Rename the target record's species...
    let target = doc! { ID_FIELD: TARGET_ID };
    let update = iris
        .update_one(
            target.clone(),
            doc! { "$set": { SPECIES_FIELD: UPDATED_SPECIES } },
        )
        .await
        .context("failed to update the target record")?;
    let updated_record = iris.find_one(target.clone()).await?;
    info!(
        step = 10,
        matched = update.matched_count,
        modified = update.modified_count,
        "updated target record"
    );

    // 11. The record with the longest sepal...
    let top_record = iris
        .find(doc! {})
        .sort(SORT_FIELD, SortOrder::Descending)
        .limit(1)
        .await?
        .next();
    info!(step = 11, found = top_record.is_some(), "top record by sepal length");
    if let Some(record) = &top_record {
        writeln!(out, "{}", record)?;
    }

    // 12. Delete the target record...
    let deleted_target = iris
        .delete_one(target)
        .await
        .context("failed to delete the target record")?;
    info!(step = 12, deleted = deleted_target.deleted_count, "deleted target record");

    // 13-14. Count, bulk delete by sepal length, count again...
    let count_before_deletion = iris.find(doc! {}).await?.count();
    let bulk = iris
        .delete_many(doc! { SORT_FIELD: DELETED_SEPAL_LENGTH })
        .await
        .context("failed to bulk delete")?;
    let count_after_deletion = iris.find(doc! {}).await?.count();
    info!(
        step = 14,
        before = count_before_deletion,
        deleted = bulk.deleted_count,
        after = count_after_deletion,
        "bulk deleted by sepal length"
    );
    writeln!(
        out,
        "Before Deletion: {}\nAfter Deletion: {}.",
        count_before_deletion, count_after_deletion
    )?;

    // 15. Empty the collection...
    let emptied = iris
        .delete_many(doc! {})
        .await
        .context("failed to empty the collection")?;
    info!(step = 15, deleted = emptied.deleted_count, "emptied collection");

    // 16. ...and drop it.
    iris.drop().await.context("failed to drop the collection")?;
    let collections_after_drop = db
        .list_collection_names()
        .await
        .context("failed to list collections")?;
    info!(step = 16, collections = ?collections_after_drop, "dropped collection");
    writeln!(out, "Collection names: {:?}.", collections_after_drop)?;

    Ok(WalkthroughReport {
        loaded: records.len(),
        created_collection: created,
        first_id,
        assigned_ids,
        collections_after_insert,
        batch_ids,
        all_records,
        projected,
        sorted_projected,
        update,
        updated_record,
        top_record,
        deleted_target,
        count_before_deletion,
        count_after_deletion,
        emptied,
        collections_after_drop,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn records(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| doc! { "sepalLength": 4.0 + i as f64 / 10.0, "species": "setosa" })
            .collect()
    }

    #[test]
    fn ids_start_at_one_after_the_first_record() {
        let numbered = assign_sequential_ids(&records(5));
        let ids: Vec<i64> = numbered.iter().map(|r| r.get_i64(ID_FIELD).unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        // The original records are untouched...
        assert!(records(5).iter().all(|r| !r.contains_key(ID_FIELD)));
    }

    #[test]
    fn legacy_batch_skips_the_first_numbered_record() {
        let numbered = assign_sequential_ids(&records(5));
        let batch = batch_records(numbered.clone(), IdAssignment::Legacy);
        let ids: Vec<i64> = batch.iter().map(|r| r.get_i64(ID_FIELD).unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 4]);

        let batch = batch_records(numbered, IdAssignment::Contiguous);
        assert_eq!(batch.len(), 4);
    }

    #[test]
    fn tiny_datasets() {
        assert!(assign_sequential_ids(&records(1)).is_empty());
        assert!(batch_records(assign_sequential_ids(&records(2)), IdAssignment::Legacy).is_empty());
    }

    #[test]
    fn id_list_formatting() {
        assert_eq!(id_list(&[Bson::Int64(2), Bson::Int64(3)]), "[2, 3]");
        assert_eq!(id_list(&[]), "[]");
    }
}
