use bson::{doc, Bson};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use flowerdb_lib::client::{LocalStore, SortOrder};
use flowerdb_lib::server::FlowerServer;
use flowerdb_lib::walkthrough::{self, WalkthroughConfig};
use flowerdb_lib::{Client, StoreError};

struct TestServer {
    address: String,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<flowerdb_lib::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("flowerdb://{}", listener.local_addr().unwrap());
        let server = FlowerServer::new(Arc::new(LocalStore::new()));
        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve(listener, async {
                    rx.await.ok();
                })
                .await
        });
        TestServer {
            address,
            shutdown,
            handle,
        }
    }

    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn walkthrough_over_tcp() {
    let server = TestServer::start().await;
    let client = Client::connect(&server.address).await.unwrap();

    let config = WalkthroughConfig {
        dataset: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("iris.json"),
        ..Default::default()
    };
    let report = walkthrough::run(&client, &config, &mut std::io::sink())
        .await
        .unwrap();

    assert!(matches!(report.first_id, Bson::ObjectId(_)));
    assert_eq!(report.all_records.len(), 149);
    assert_eq!(report.updated_record.unwrap().get_str("species").unwrap(), "NA");
    assert_eq!(report.top_record.unwrap().get_f64("sepalLength").unwrap(), 7.9);
    assert_eq!(report.count_before_deletion, 148);
    assert_eq!(report.count_after_deletion, 145);
    assert!(report.collections_after_drop.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn clients_share_the_server_store() {
    let server = TestServer::start().await;
    let a = Client::connect(&server.address).await.unwrap();
    let b = Client::connect(&server.address).await.unwrap();

    let iris_a = a.database("flower").collection("iris");
    iris_a
        .insert_many(vec![
            doc! { "_id": 1, "sepalLength": 5.1 },
            doc! { "_id": 2, "sepalLength": 6.4 },
        ])
        .await
        .unwrap();

    let iris_b = b.database("flower").collection("iris");
    let top = iris_b
        .find(doc! {})
        .sort("sepalLength", SortOrder::Descending)
        .limit(1)
        .await
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(top.get_i32("_id").unwrap(), 2);
    assert_eq!(
        b.database("flower").list_collection_names().await.unwrap(),
        vec!["iris".to_string()]
    );

    server.stop().await;
}

#[tokio::test]
async fn server_errors_reach_the_client() {
    let server = TestServer::start().await;
    let client = Client::connect(&server.address).await.unwrap();
    let iris = client.database("flower").collection("iris");

    iris.insert_one(doc! { "_id": 20 }).await.unwrap();
    let err = iris.insert_one(doc! { "_id": 20 }).await.unwrap_err();
    match err {
        StoreError::Remote { code, .. } => assert_eq!(code, "DuplicateKey"),
        other => panic!("unexpected error: {}", other),
    }

    let err = iris
        .update_one(doc! { "_id": 20 }, doc! { "species": "NA" })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Remote { ref code, .. } if code == "InvalidUpdate"));

    // The connection is still usable after errors...
    assert_eq!(iris.count_documents(doc! {}).await.unwrap(), 1);

    server.stop().await;
}

#[tokio::test]
async fn connecting_to_nothing_fails() {
    // Grab a free port, then close it again...
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = Client::connect(&addr.to_string()).await.err().unwrap();
    assert!(matches!(err, StoreError::Io(_)));
}

#[tokio::test]
async fn oversized_reply_leaves_the_connection_usable() {
    let server = TestServer::start().await;
    let client = Client::connect(&server.address).await.unwrap();
    let blobs = client.database("flower").collection("blobs");

    // Each insert fits in a frame, but all of them together don't...
    let blob = "x".repeat(1 << 20);
    for i in 0..17 {
        blobs
            .insert_one(doc! { "_id": i, "blob": blob.as_str() })
            .await
            .unwrap();
    }

    let err = blobs.find(doc! {}).await.err().unwrap();
    assert!(matches!(err, StoreError::Remote { ref code, .. } if code == "Protocol"));

    assert_eq!(blobs.count_documents(doc! {}).await.unwrap(), 17);
    let one = blobs.find_one(doc! { "_id": 3 }).await.unwrap().unwrap();
    assert_eq!(one.get_str("blob").unwrap().len(), 1 << 20);

    server.stop().await;
}
