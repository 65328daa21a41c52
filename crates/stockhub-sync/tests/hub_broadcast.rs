//! Hub integration tests: real WebSocket clients against a hub on an
//! ephemeral port, backed by an in-memory store.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, TcpListener};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use stockhub_core::{Money, NewProduct};
use stockhub_db::{Database, DbConfig};
use stockhub_sync::{
    Envelope, HubHandle, HubServer, MessageType, ModeFlag, Router, ServerSettings, Status,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_hub() -> (HubHandle, Database) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let settings = ServerSettings {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };
    let hub = HubServer::new(settings, Router::new(db.clone(), ModeFlag::default()))
        .start()
        .await
        .unwrap();
    (hub, db)
}

async fn connect(hub: &HubHandle) -> Client {
    let url = format!("ws://{}/ws", hub.local_addr());
    let (client, _) = connect_async(url.as_str()).await.unwrap();
    client
}

async fn wait_for_clients(hub: &HubHandle, expected: usize) {
    timeout(WAIT, async {
        while hub.client_count().await != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client count never reached the expected value");
}

async fn send(client: &mut Client, frame: Value) {
    client.send(Message::text(frame.to_string())).await.unwrap();
}

/// Next envelope on the socket, skipping keep-alive frames.
async fn next_envelope(client: &mut Client) -> Envelope {
    timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return Envelope::from_json(text.as_str()).unwrap(),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => panic!("unexpected frame: {:?}", other),
            }
        }
    })
    .await
    .expect("no envelope arrived")
}

#[tokio::test]
async fn test_response_is_broadcast_to_every_client() {
    let (hub, db) = start_hub().await;
    db.products()
        .create(&NewProduct::new("Widget", Money::from_cents(1000), 100).unwrap())
        .await
        .unwrap();

    let mut a = connect(&hub).await;
    let mut b = connect(&hub).await;
    wait_for_clients(&hub, 2).await;

    send(
        &mut a,
        json!({"action": "PRODUCT_GET_ALL", "type": "REQUEST", "message_id": "a-1"}),
    )
    .await;

    for client in [&mut a, &mut b] {
        let envelope = next_envelope(client).await;
        assert_eq!(envelope.action, "PRODUCT_GET_ALL");
        assert_eq!(envelope.message_type, MessageType::Response);
        assert_eq!(envelope.status, Some(Status::Success));
        assert_eq!(envelope.message_id, json!("a-1"));
        assert_eq!(envelope.payload["products"][0]["name"], "Widget");
        assert_eq!(envelope.payload["products"][0]["price"], json!(10.0));
    }

    hub.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dropped_frames_produce_nothing() {
    let (hub, _db) = start_hub().await;

    let mut a = connect(&hub).await;
    let mut b = connect(&hub).await;
    wait_for_clients(&hub, 2).await;

    a.send(Message::text("{not json")).await.unwrap();
    send(&mut a, json!({"action": "SELF_DESTRUCT", "message_id": "x"})).await;
    send(&mut a, json!({"action": "INVENTORY_GET_ALL", "message_id": "after"})).await;

    // The first thing anyone sees is the answer to the valid request
    let envelope = next_envelope(&mut b).await;
    assert_eq!(envelope.message_id, json!("after"));
    assert_eq!(envelope.payload["inventory_items"], json!([]));

    let envelope = next_envelope(&mut a).await;
    assert_eq!(envelope.message_id, json!("after"));

    hub.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stock_movement_reaches_other_terminal() {
    let (hub, db) = start_hub().await;
    let product = db
        .products()
        .create(&NewProduct::new("Widget", Money::from_cents(1000), 100).unwrap())
        .await
        .unwrap();

    let mut scanner = connect(&hub).await;
    let mut terminal = connect(&hub).await;
    wait_for_clients(&hub, 2).await;

    send(
        &mut scanner,
        json!({
            "action": "INVENTORY_OUT",
            "message_id": 17,
            "payload": {"inventory_items": [
                {"product_id": product.id, "product_name": "Widget", "quantity": 20}
            ]}
        }),
    )
    .await;

    let envelope = next_envelope(&mut terminal).await;
    assert_eq!(envelope.action, "INVENTORY_OUT");
    assert_eq!(envelope.message_id, json!(17));
    assert_eq!(envelope.payload["inventory_items"][0]["quantity"], json!(20));

    let stored = db.products().get_by_id(product.id).await.unwrap().unwrap();
    assert_eq!(stored.quantity, 80);

    hub.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_tag_write_forwarded_as_request() {
    let (hub, db) = start_hub().await;
    let product = db
        .products()
        .create(&NewProduct::new("Label Roll", Money::from_cents(250), 12).unwrap())
        .await
        .unwrap();

    let mut terminal = connect(&hub).await;
    let mut tag_writer = connect(&hub).await;
    wait_for_clients(&hub, 2).await;

    send(
        &mut terminal,
        json!({"action": "TAG_WRITE", "message_id": "tw", "payload": product.id}),
    )
    .await;

    let envelope = next_envelope(&mut tag_writer).await;
    assert_eq!(envelope.action, "TAG_WRITE");
    assert_eq!(envelope.message_type, MessageType::Request);
    assert_eq!(envelope.payload["product_id"], json!(product.id));

    // The peripheral's reply is not routed, so nothing else is broadcast
    send(
        &mut tag_writer,
        json!({"action": "TAG_WRITE", "type": "RESPONSE", "status": "SUCCESS", "message_id": "tw"}),
    )
    .await;
    send(&mut tag_writer, json!({"action": "PRODUCT_GET_ALL", "message_id": "next"})).await;

    let envelope = next_envelope(&mut terminal).await;
    assert_eq!(envelope.action, "TAG_WRITE");
    let envelope = next_envelope(&mut terminal).await;
    assert_eq!(envelope.message_id, json!("next"));

    hub.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_removes_client() {
    let (hub, _db) = start_hub().await;

    let a = connect(&hub).await;
    let mut b = connect(&hub).await;
    wait_for_clients(&hub, 2).await;
    assert_eq!(hub.client_ids().await.len(), 2);

    drop(a);
    wait_for_clients(&hub, 1).await;

    b.close(None).await.unwrap();
    wait_for_clients(&hub, 0).await;

    hub.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_status_endpoint() {
    let (hub, _db) = start_hub().await;
    let _client = connect(&hub).await;
    wait_for_clients(&hub, 1).await;

    let mut stream = TcpStream::connect(hub.local_addr()).await.unwrap();
    stream
        .write_all(b"GET /status HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    timeout(WAIT, stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    let body = response.split("\r\n\r\n").nth(1).unwrap();
    let status: Value = serde_json::from_str(body).unwrap();
    assert_eq!(status["connected_clients"], json!(1));
    assert_eq!(status["mode"], Value::Null);

    hub.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_connections() {
    let (hub, _db) = start_hub().await;
    let mut client = connect(&hub).await;
    wait_for_clients(&hub, 1).await;

    hub.shutdown().await.unwrap();

    let closed = timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn test_bind_failure_is_transport_error() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let settings = ServerSettings {
        bind_addr: "127.0.0.1".to_string(),
        port: taken.local_addr().unwrap().port(),
        ..Default::default()
    };

    let result = HubServer::new(settings, Router::new(db, ModeFlag::default()))
        .start()
        .await;

    assert!(matches!(result, Err(stockhub_sync::SyncError::TransportError(_))));
}
