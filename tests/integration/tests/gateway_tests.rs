//! Gateway integration tests
//!
//! A real WebSocket client against the axum mock gateway.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chat_client::{Client, Event, EventKind, Predicate};
use chat_gateway::protocol::PresenceUpdatePayload;
use chat_gateway::{Compression, ConnectionState, GatewayMessage, OpCode};
use flate2::write::ZlibEncoder;
use integration_tests::{
    message_json, ready_json, GatewaySocket, MockPlatform, STEP_TIMEOUT, TEST_TOKEN,
};
use tokio::sync::mpsc;

/// Forward every `kind` event into a channel
fn collect(client: &Client, kind: EventKind) -> mpsc::UnboundedReceiver<Arc<Event>> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.on(kind, Predicate::any(), move |event: Arc<Event>| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(event);
            Ok(())
        }
    });
    rx
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<Arc<Event>>) -> Arc<Event> {
    tokio::time::timeout(STEP_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("dispatcher dropped")
}

/// Hello, Identify, Ready on a fresh connection
async fn identify(platform: &MockPlatform, resume_url: Option<&str>) -> GatewaySocket {
    let mut socket = platform.accept().await.unwrap();
    socket.send(&GatewayMessage::hello(45_000)).await.unwrap();

    let identify = socket
        .expect_op(OpCode::Identify)
        .await
        .unwrap()
        .as_identify()
        .unwrap();
    assert_eq!(identify.token, TEST_TOKEN);
    assert_eq!(identify.shard, [0, 1]);

    socket
        .send(&GatewayMessage::dispatch(
            "READY",
            1,
            ready_json("abc", resume_url),
        ))
        .await
        .unwrap();
    socket
}

#[tokio::test]
async fn test_connect_identify_and_dispatch() {
    let platform = MockPlatform::start().await.unwrap();
    let client = platform.client(platform.client_options()).unwrap();
    let mut messages = collect(&client, EventKind::MessageCreate);

    let (started, mut socket) = tokio::join!(client.start(), identify(&platform, None));
    started.unwrap();

    // the endpoint came from GET /gateway
    assert_eq!(platform.requests()[0].path, "/gateway");
    assert_eq!(platform.gateway_queries(), vec!["v=10&encoding=json"]);

    socket
        .send(&GatewayMessage::dispatch(
            "MESSAGE_CREATE",
            2,
            message_json(7, 42, "hello gateway"),
        ))
        .await
        .unwrap();

    let event = next_event(&mut messages).await;
    assert_eq!(event.as_message().unwrap().content, "hello gateway");

    let status = client.status().borrow().clone();
    assert_eq!(status.state, ConnectionState::Ready);
    assert_eq!(status.session_id.as_deref(), Some("abc"));
    assert_eq!(status.sequence, Some(2));

    client.disconnect().await.unwrap();
    assert_eq!(socket.expect_close().await.unwrap(), Some(1000));
}

#[tokio::test]
async fn test_resume_after_server_close() {
    let platform = MockPlatform::start().await.unwrap();
    let client = platform.client(platform.client_options()).unwrap();
    let mut resumed = collect(&client, EventKind::Resumed);
    let mut messages = collect(&client, EventKind::MessageCreate);

    let resume_url = platform.gateway_url();
    let (started, mut socket) =
        tokio::join!(client.start(), identify(&platform, Some(&resume_url)));
    started.unwrap();

    socket
        .send(&GatewayMessage::dispatch(
            "MESSAGE_CREATE",
            2,
            message_json(7, 42, "before drop"),
        ))
        .await
        .unwrap();
    next_event(&mut messages).await;
    socket.close(4000).await.unwrap();

    let mut socket = platform.accept().await.unwrap();
    socket.send(&GatewayMessage::hello(45_000)).await.unwrap();
    let resume = socket
        .expect_op(OpCode::Resume)
        .await
        .unwrap()
        .as_resume()
        .unwrap();
    assert_eq!(resume.session_id, "abc");
    assert_eq!(resume.seq, 2);

    socket
        .send(&GatewayMessage::dispatch("RESUMED", 3, serde_json::Value::Null))
        .await
        .unwrap();
    next_event(&mut resumed).await;
    assert_eq!(client.status().borrow().reconnects, 1);

    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_terminal_close_is_surfaced() {
    let platform = MockPlatform::start().await.unwrap();
    let client = platform.client(platform.client_options()).unwrap();
    let mut disconnected = collect(&client, EventKind::Disconnected);

    let server = async {
        let mut socket = platform.accept().await.unwrap();
        socket.send(&GatewayMessage::hello(45_000)).await.unwrap();
        socket.expect_op(OpCode::Identify).await.unwrap();
        socket.close(4004).await.unwrap();
    };
    let (started, ()) = tokio::join!(client.start(), server);

    let err = started.unwrap_err();
    assert!(err.is_terminal());

    let event = next_event(&mut disconnected).await;
    assert!(matches!(
        *event,
        Event::Disconnected {
            code: Some(4004),
            terminal: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_compressed_payloads() {
    let platform = MockPlatform::start().await.unwrap();
    let client = platform
        .client(platform.client_options().compression(Compression::Payload))
        .unwrap();

    let server = async {
        let mut socket = platform.accept().await.unwrap();
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(GatewayMessage::hello(45_000).to_json().unwrap().as_bytes())
            .unwrap();
        socket.send_binary(encoder.finish().unwrap()).await.unwrap();

        let identify = socket
            .expect_op(OpCode::Identify)
            .await
            .unwrap()
            .as_identify()
            .unwrap();
        assert!(identify.compress);
        socket
            .send(&GatewayMessage::dispatch("READY", 1, ready_json("abc", None)))
            .await
            .unwrap();
        socket
    };
    let (started, _socket) = tokio::join!(client.start(), server);
    started.unwrap();
}

#[tokio::test]
async fn test_presence_update_reaches_gateway() {
    let platform = MockPlatform::start().await.unwrap();
    let client = platform.client(platform.client_options()).unwrap();

    let (started, mut socket) = tokio::join!(client.start(), identify(&platform, None));
    started.unwrap();

    client
        .update_presence(&PresenceUpdatePayload::new(chat_core::Status::Dnd))
        .await
        .unwrap();
    let presence = socket.expect_op(OpCode::PresenceUpdate).await.unwrap();
    assert_eq!(presence.d.unwrap()["status"], "dnd");

    let waited = client
        .wait_for(
            EventKind::MessageCreate,
            Predicate::default().equals("content", "never sent"),
            Duration::from_millis(100),
        )
        .await;
    assert!(waited.is_none());

    client.disconnect().await.unwrap();
}
