use bson::Document;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{DeleteResult, InsertManyResult, InsertOneResult, Namespace, UpdateResult};
use crate::error::{Result, StoreError};
use crate::query::FindOptions;

/// A request from a client, one per store operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Request {
    Ping,
    ListCollections {
        db: String,
    },
    CreateCollection {
        ns: Namespace,
    },
    InsertOne {
        ns: Namespace,
        document: Document,
    },
    InsertMany {
        ns: Namespace,
        documents: Vec<Document>,
    },
    Find {
        ns: Namespace,
        filter: Document,
        options: FindOptions,
    },
    Count {
        ns: Namespace,
        filter: Document,
    },
    Update {
        ns: Namespace,
        filter: Document,
        update: Document,
        multi: bool,
    },
    Delete {
        ns: Namespace,
        filter: Document,
        multi: bool,
    },
    Drop {
        ns: Namespace,
    },
}

/// The payload of a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyBody {
    Pong,
    CollectionNames(Vec<String>),
    Created(bool),
    InsertOne(InsertOneResult),
    InsertMany(InsertManyResult),
    Documents(Vec<Document>),
    Count(u64),
    Update(UpdateResult),
    Delete(DeleteResult),
    Dropped(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    Ok(ReplyBody),
    Error { code: String, message: String },
}

impl Reply {
    pub fn from_result(result: Result<ReplyBody>) -> Self {
        match result {
            Ok(body) => Reply::Ok(body),
            Err(e) => Reply::Error {
                code: e.code().to_string(),
                message: e.to_string(),
            },
        }
    }

    pub fn into_result(self) -> Result<ReplyBody> {
        match self {
            Reply::Ok(body) => Ok(body),
            Reply::Error { code, message } => Err(StoreError::Remote { code, message }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// A fresh id per request, echoed back in the response.
    pub request_id: String,
    pub request: Request,
}

impl RequestEnvelope {
    pub fn new(request: Request) -> Self {
        RequestEnvelope {
            request_id: Uuid::new_v4().to_string(),
            request,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub request_id: String,
    pub reply: Reply,
}

/// Converts a message to the BSON document sent on the wire.
pub fn encode<T: Serialize>(message: &T) -> Result<Document> {
    Ok(bson::to_document(message)?)
}

/// Converts a received BSON document back into a message.
pub fn decode<T: DeserializeOwned>(doc: Document) -> Result<T> {
    Ok(bson::from_document(doc)?)
}
