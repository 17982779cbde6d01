use async_trait::async_trait;
use bson::Document;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::store::DocumentStore;
use crate::db::{DeleteResult, InsertManyResult, InsertOneResult, Namespace, UpdateResult};
use crate::error::{Result, StoreError};
use crate::networking::{
    decode, encode, read_frame, write_frame, ReplyBody, Request, RequestEnvelope,
    ResponseEnvelope,
};
use crate::query::FindOptions;

/// A store reached over a single TCP connection to a `flowerdb_server`.
///
/// Requests are strictly sequential: the connection is locked from
/// sending a request until its response has been read. A call that stops
/// partway (an error, or its future dropped) leaves the stream out of
/// step with the server, so every later call fails.
pub struct RemoteStore {
    conn: Mutex<Connection>,
}

struct Connection {
    stream: TcpStream,
    /// Set while a request is in flight; still set afterwards if the call
    /// didn't finish cleanly.
    broken: bool,
}

impl RemoteStore {
    /// Opens a connection to a server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(RemoteStore {
            conn: Mutex::new(Connection {
                stream,
                broken: false,
            }),
        })
    }

    /// Sends one request and waits for its reply.
    async fn call(&self, request: Request) -> Result<ReplyBody> {
        let envelope = RequestEnvelope::new(request);
        let frame = encode(&envelope)?;

        let mut conn = self.conn.lock().await;
        if conn.broken {
            return Err(StoreError::Protocol(
                "connection is out of step with the server after an interrupted request"
                    .to_string(),
            ));
        }
        conn.broken = true;
        write_frame(&mut conn.stream, &frame).await?;
        let reply = read_frame(&mut conn.stream)
            .await?
            .ok_or_else(|| StoreError::Protocol("server closed the connection".to_string()))?;

        let response: ResponseEnvelope = decode(reply)?;
        if response.request_id != envelope.request_id {
            return Err(StoreError::Protocol(format!(
                "response for request {} arrived while waiting for {}",
                response.request_id, envelope.request_id
            )));
        }
        conn.broken = false;
        drop(conn);

        debug!(request_id = %envelope.request_id, "received reply");
        response.reply.into_result()
    }
}

fn unexpected(body: ReplyBody) -> StoreError {
    StoreError::Protocol(format!("unexpected reply {:?}", body))
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn ping(&self) -> Result<()> {
        match self.call(Request::Ping).await? {
            ReplyBody::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn list_collection_names(&self, db: &str) -> Result<Vec<String>> {
        let request = Request::ListCollections { db: db.to_string() };
        match self.call(request).await? {
            ReplyBody::CollectionNames(names) => Ok(names),
            other => Err(unexpected(other)),
        }
    }

    async fn create_collection(&self, ns: &Namespace) -> Result<bool> {
        let request = Request::CreateCollection { ns: ns.clone() };
        match self.call(request).await? {
            ReplyBody::Created(created) => Ok(created),
            other => Err(unexpected(other)),
        }
    }

    async fn insert_one(&self, ns: &Namespace, doc: Document) -> Result<InsertOneResult> {
        let request = Request::InsertOne {
            ns: ns.clone(),
            document: doc,
        };
        match self.call(request).await? {
            ReplyBody::InsertOne(result) => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    async fn insert_many(&self, ns: &Namespace, docs: Vec<Document>) -> Result<InsertManyResult> {
        let request = Request::InsertMany {
            ns: ns.clone(),
            documents: docs,
        };
        match self.call(request).await? {
            ReplyBody::InsertMany(result) => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    async fn find(
        &self,
        ns: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>> {
        let request = Request::Find {
            ns: ns.clone(),
            filter,
            options,
        };
        match self.call(request).await? {
            ReplyBody::Documents(docs) => Ok(docs),
            other => Err(unexpected(other)),
        }
    }

    async fn count(&self, ns: &Namespace, filter: Document) -> Result<u64> {
        let request = Request::Count {
            ns: ns.clone(),
            filter,
        };
        match self.call(request).await? {
            ReplyBody::Count(n) => Ok(n),
            other => Err(unexpected(other)),
        }
    }

    async fn update(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
        multi: bool,
    ) -> Result<UpdateResult> {
        let request = Request::Update {
            ns: ns.clone(),
            filter,
            update,
            multi,
        };
        match self.call(request).await? {
            ReplyBody::Update(result) => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    async fn delete(&self, ns: &Namespace, filter: Document, multi: bool) -> Result<DeleteResult> {
        let request = Request::Delete {
            ns: ns.clone(),
            filter,
            multi,
        };
        match self.call(request).await? {
            ReplyBody::Delete(result) => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    async fn drop_collection(&self, ns: &Namespace) -> Result<bool> {
        let request = Request::Drop { ns: ns.clone() };
        match self.call(request).await? {
            ReplyBody::Dropped(dropped) => Ok(dropped),
            other => Err(unexpected(other)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// A server that reads requests and answers each with `answer`, or
    /// never answers if `answer` is `None`.
    async fn fake_server(answer: Option<ResponseEnvelope>) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            while let Ok(Some(_)) = read_frame(&mut stream).await {
                if let Some(answer) = &answer {
                    write_frame(&mut stream, &encode(answer).unwrap())
                        .await
                        .unwrap();
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn interrupted_call_breaks_the_connection() {
        let store = RemoteStore::connect(fake_server(None).await).await.unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(50), store.ping()).await;
        assert!(timed_out.is_err());

        // The next call fails straight away instead of waiting on a stale reply...
        let err = tokio::time::timeout(Duration::from_secs(5), store.ping())
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, StoreError::Protocol(_)));
    }

    #[tokio::test]
    async fn mismatched_reply_breaks_the_connection() {
        let stale = ResponseEnvelope {
            request_id: "someone-else".to_string(),
            reply: crate::networking::Reply::Ok(ReplyBody::Pong),
        };
        let store = RemoteStore::connect(fake_server(Some(stale)).await).await.unwrap();

        let err = store.ping().await.unwrap_err();
        assert!(err.to_string().contains("someone-else"));
        let err = store.ping().await.unwrap_err();
        assert!(err.to_string().contains("out of step"));
    }
}
