use std::future::Future;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::client::DocumentStore;
use crate::error::Result;
use crate::networking::{
    decode, encode, encode_frame, read_frame, write_raw_frame, Reply, ReplyBody, Request,
    RequestEnvelope, ResponseEnvelope,
};

/// Serves a document store to TCP clients.
///
/// Each connection gets its own task; requests on one connection are
/// answered in the order they arrive.
#[derive(Clone)]
pub struct FlowerServer {
    store: Arc<dyn DocumentStore>,
}

impl FlowerServer {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        FlowerServer { store }
    }

    /// Accepts connections until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(addr = %listener.local_addr()?, "listening");
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    info!(%peer, "accepted connection");
                    let store = self.store.clone();
                    tokio::spawn(async move {
                        match handle_connection(store, stream).await {
                            Ok(()) => info!(%peer, "connection closed"),
                            Err(e) => warn!(%peer, error = %e, "connection closed with error"),
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("shutting down");
                    return Ok(());
                }
            }
        }
    }
}

/// Reads requests off one connection until the client hangs up.
async fn handle_connection(store: Arc<dyn DocumentStore>, mut stream: TcpStream) -> Result<()> {
    stream.set_nodelay(true)?;
    while let Some(frame) = read_frame(&mut stream).await? {
        // A frame that isn't a request leaves nothing to answer, so drop
        // the connection...
        let envelope: RequestEnvelope = decode(frame)?;
        debug!(request_id = %envelope.request_id, request = ?envelope.request, "handling request");

        let reply = Reply::from_result(dispatch(store.as_ref(), envelope.request).await);
        let response = ResponseEnvelope {
            request_id: envelope.request_id,
            reply,
        };
        write_raw_frame(&mut stream, &response_frame(response)?).await?;
    }
    Ok(())
}

/// Encodes a response, replacing a reply that can't be sent (too large,
/// or not representable as BSON) with an error reply for the same request.
fn response_frame(response: ResponseEnvelope) -> Result<Vec<u8>> {
    match encode(&response).and_then(|doc| encode_frame(&doc)) {
        Ok(frame) => Ok(frame),
        Err(e) => {
            warn!(request_id = %response.request_id, error = %e, "reply can't be sent, answering with an error");
            let fallback = ResponseEnvelope {
                request_id: response.request_id,
                reply: Reply::from_result(Err(e)),
            };
            encode_frame(&encode(&fallback)?)
        }
    }
}

/// Runs one request against a store.
pub async fn dispatch(store: &dyn DocumentStore, request: Request) -> Result<ReplyBody> {
    Ok(match request {
        Request::Ping => {
            store.ping().await?;
            ReplyBody::Pong
        }
        Request::ListCollections { db } => {
            ReplyBody::CollectionNames(store.list_collection_names(&db).await?)
        }
        Request::CreateCollection { ns } => ReplyBody::Created(store.create_collection(&ns).await?),
        Request::InsertOne { ns, document } => {
            ReplyBody::InsertOne(store.insert_one(&ns, document).await?)
        }
        Request::InsertMany { ns, documents } => {
            ReplyBody::InsertMany(store.insert_many(&ns, documents).await?)
        }
        Request::Find {
            ns,
            filter,
            options,
        } => ReplyBody::Documents(store.find(&ns, filter, options).await?),
        Request::Count { ns, filter } => ReplyBody::Count(store.count(&ns, filter).await?),
        Request::Update {
            ns,
            filter,
            update,
            multi,
        } => ReplyBody::Update(store.update(&ns, filter, update, multi).await?),
        Request::Delete { ns, filter, multi } => {
            ReplyBody::Delete(store.delete(&ns, filter, multi).await?)
        }
        Request::Drop { ns } => ReplyBody::Dropped(store.drop_collection(&ns).await?),
    })
}
