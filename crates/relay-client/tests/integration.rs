//! End-to-end tests against a real in-process WebSocket server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

use relay_bus::TransportConfig;
use relay_client::{HandlerError, HandlerTable, MessageRouter, RouterCallbacks, StatusPhase};
use relay_core::{Envelope, MessageKind};

const TIMEOUT: Duration = Duration::from_secs(5);

// ── Test server ──────────────────────────────────────────────────────────────

enum ServerCommand {
    Frame(String),
    Close,
}

/// One-connection test server: records the handshake URI, captures client
/// frames, and pushes frames back on command.
struct TestServer {
    url: String,
    inbound: mpsc::Receiver<String>,
    commands: mpsc::Sender<ServerCommand>,
    handshake_uri: Arc<Mutex<Option<String>>>,
}

async fn boot_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(32);
    let (command_tx, mut command_rx) = mpsc::channel::<ServerCommand>(32);
    let handshake_uri = Arc::new(Mutex::new(None::<String>));
    let uri_slot = Arc::clone(&handshake_uri);

    let _server = tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let ws = accept_hdr_async(stream, |request: &Request, response: Response| {
            *uri_slot.lock() = Some(request.uri().to_string());
            Ok(response)
        })
        .await
        .unwrap();
        let (mut ws_tx, mut ws_rx) = ws.split();
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(ServerCommand::Frame(text)) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(ServerCommand::Close) => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                    None => break,
                },
                frame = ws_rx.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let _ = inbound_tx.send(text.to_string()).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }
    });

    TestServer {
        url: format!("ws://{addr}/ws"),
        inbound: inbound_rx,
        commands: command_tx,
        handshake_uri,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

struct Observed {
    errors: Mutex<Vec<String>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl Observed {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            errors: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        })
    }
}

fn router_for(url: &str, token: &str, observed: &Arc<Observed>) -> MessageRouter {
    let callbacks = RouterCallbacks::new()
        .on_connected({
            let o = Arc::clone(observed);
            move || {
                let _ = o.connects.fetch_add(1, Ordering::SeqCst);
            }
        })
        .on_disconnected({
            let o = Arc::clone(observed);
            move || {
                let _ = o.disconnects.fetch_add(1, Ordering::SeqCst);
            }
        })
        .on_error({
            let o = Arc::clone(observed);
            move |reason| o.errors.lock().push(reason.to_owned())
        });
    MessageRouter::with_config(
        url,
        token,
        TransportConfig {
            handshake_timeout_ms: 2_000,
            ..TransportConfig::default()
        },
        callbacks,
    )
}

async fn recv_frame(inbound: &mut mpsc::Receiver<String>) -> String {
    tokio::time::timeout(TIMEOUT, inbound.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("server task ended")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn now_millis() -> i64 {
    i64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis(),
    )
    .unwrap()
}

/// Handler that counts invocations and records envelopes.
fn capturing_handler(
    count: &Arc<AtomicUsize>,
    seen: &Arc<Mutex<Vec<Envelope>>>,
) -> impl Fn(&Envelope) -> Result<(), HandlerError> + Send + Sync + use<> {
    let count = Arc::clone(count);
    let seen = Arc::clone(seen);
    move |envelope: &Envelope| {
        let _ = count.fetch_add(1, Ordering::SeqCst);
        seen.lock().push(envelope.clone());
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn connect_resolves_with_token_in_handshake() {
    let server = boot_server().await;
    let observed = Observed::new();
    let router = router_for(&server.url, "abc", &observed);

    router.connect().await.unwrap();

    let status = router.status();
    assert_eq!(status.phase, StatusPhase::Connected);
    assert!(status.last_error.is_none());
    assert_eq!(observed.connects.load(Ordering::SeqCst), 1);

    let uri = server.handshake_uri.lock().clone().unwrap();
    assert!(uri.ends_with("/ws?token=abc"), "unexpected URI: {uri}");
}

#[tokio::test]
async fn send_transmits_exactly_one_frame() {
    let mut server = boot_server().await;
    let observed = Observed::new();
    let router = router_for(&server.url, "abc", &observed);
    router.connect().await.unwrap();

    let before = now_millis();
    router.send(MessageKind::Ping, Map::new()).unwrap();

    let frame = recv_frame(&mut server.inbound).await;
    let value: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(value["kind"], "PING");
    assert_eq!(value["data"], json!({}));
    let timestamp = value["timestamp"].as_i64().unwrap();
    assert!(timestamp >= before && timestamp <= now_millis() + 1);

    // nothing else follows
    let extra = tokio::time::timeout(Duration::from_millis(200), server.inbound.recv()).await;
    assert!(extra.is_err(), "unexpected second frame");
}

#[tokio::test]
async fn inbound_frame_dispatches_to_registered_handler() {
    let server = boot_server().await;
    let observed = Observed::new();
    let router = router_for(&server.url, "abc", &observed);
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    router.register_handlers(
        HandlerTable::new().on(MessageKind::Pong, capturing_handler(&count, &seen)),
    );
    router.connect().await.unwrap();

    server
        .commands
        .send(ServerCommand::Frame(
            r#"{"kind":"PONG","data":{"ok":true},"timestamp":1754400000123}"#.into(),
        ))
        .await
        .unwrap();

    wait_until(|| count.load(Ordering::SeqCst) == 1).await;
    let envelopes = seen.lock();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].kind, MessageKind::Pong);
    assert_eq!(envelopes[0].data["ok"], true);
    assert_eq!(envelopes[0].timestamp, 1_754_400_000_123);
    assert!(observed.errors.lock().is_empty());
}

#[tokio::test]
async fn unknown_kind_is_quietly_unhandled() {
    let server = boot_server().await;
    let observed = Observed::new();
    let router = router_for(&server.url, "abc", &observed);
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    router.register_handlers(
        HandlerTable::new().on(MessageKind::Pong, capturing_handler(&count, &seen)),
    );
    router.connect().await.unwrap();

    // frames dispatch in arrival order, so once the PONG lands the
    // UNKNOWN_X before it has been fully processed
    server
        .commands
        .send(ServerCommand::Frame(
            r#"{"kind":"UNKNOWN_X","data":{},"timestamp":1}"#.into(),
        ))
        .await
        .unwrap();
    server
        .commands
        .send(ServerCommand::Frame(
            r#"{"kind":"PONG","data":{},"timestamp":2}"#.into(),
        ))
        .await
        .unwrap();

    wait_until(|| count.load(Ordering::SeqCst) == 1).await;
    assert!(observed.errors.lock().is_empty());
    assert!(router.status().last_error.is_none());
}

#[tokio::test]
async fn failing_handler_is_isolated_from_the_connection() {
    let server = boot_server().await;
    let observed = Observed::new();
    let router = router_for(&server.url, "abc", &observed);
    let count = Arc::new(AtomicUsize::new(0));
    router.register_handlers(HandlerTable::new().on(MessageKind::Pong, {
        let count = Arc::clone(&count);
        move |_: &Envelope| {
            let _ = count.fetch_add(1, Ordering::SeqCst);
            Err(HandlerError::new("boom"))
        }
    }));
    router.connect().await.unwrap();

    let pong = r#"{"kind":"PONG","data":{},"timestamp":1}"#;
    server
        .commands
        .send(ServerCommand::Frame(pong.into()))
        .await
        .unwrap();
    wait_until(|| observed.errors.lock().len() == 1).await;

    {
        let errors = observed.errors.lock();
        assert!(errors[0].contains("PONG"), "missing kind: {}", errors[0]);
        assert!(errors[0].contains("boom"), "missing reason: {}", errors[0]);
    }
    // still connected, and later frames still dispatch
    assert_eq!(router.status().phase, StatusPhase::Connected);
    server
        .commands
        .send(ServerCommand::Frame(pong.into()))
        .await
        .unwrap();
    wait_until(|| count.load(Ordering::SeqCst) == 2).await;
    assert_eq!(observed.disconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_frame_keeps_connection_open() {
    let server = boot_server().await;
    let observed = Observed::new();
    let router = router_for(&server.url, "abc", &observed);
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    router.register_handlers(
        HandlerTable::new().on(MessageKind::Pong, capturing_handler(&count, &seen)),
    );
    router.connect().await.unwrap();

    server
        .commands
        .send(ServerCommand::Frame("this is not json".into()))
        .await
        .unwrap();
    server
        .commands
        .send(ServerCommand::Frame(
            r#"{"kind":"PONG","data":{},"timestamp":3}"#.into(),
        ))
        .await
        .unwrap();

    wait_until(|| count.load(Ordering::SeqCst) == 1).await;
    let errors = observed.errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("malformed frame"));
    assert_eq!(router.status().phase, StatusPhase::Connected);
}

#[tokio::test]
async fn disconnect_stops_sends_and_dispatch() {
    let mut server = boot_server().await;
    let observed = Observed::new();
    let router = router_for(&server.url, "abc", &observed);
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    router.register_handlers(
        HandlerTable::new().on(MessageKind::Pong, capturing_handler(&count, &seen)),
    );
    router.connect().await.unwrap();

    router.disconnect();
    assert_eq!(observed.disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(router.status().phase, StatusPhase::Idle);

    let result = router.send(MessageKind::Ping, Map::new());
    assert!(matches!(result, Err(relay_core::RelayError::NotConnected)));
    let extra = tokio::time::timeout(Duration::from_millis(200), server.inbound.recv()).await;
    assert!(
        extra.is_err() || extra.unwrap().is_none(),
        "frame reached the wire after disconnect"
    );
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unsolicited_close_reports_fault_and_disconnect() {
    let server = boot_server().await;
    let observed = Observed::new();
    let router = router_for(&server.url, "abc", &observed);
    router.connect().await.unwrap();

    server.commands.send(ServerCommand::Close).await.unwrap();

    wait_until(|| observed.disconnects.load(Ordering::SeqCst) == 1).await;
    let errors = observed.errors.lock().clone();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("transport fault"));
    let status = router.status();
    assert_eq!(status.phase, StatusPhase::Error);
    assert!(status.last_error.is_some());
    assert!(matches!(
        router.send(MessageKind::Ping, Map::new()),
        Err(relay_core::RelayError::NotConnected)
    ));
}

#[tokio::test]
async fn loopback_roundtrip_preserves_envelope() {
    let mut server = boot_server().await;
    let observed = Observed::new();
    let router = router_for(&server.url, "abc", &observed);
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    router.register_handlers(
        HandlerTable::new().on(MessageKind::Status, capturing_handler(&count, &seen)),
    );
    router.connect().await.unwrap();

    let mut payload = Map::new();
    let _ = payload.insert("file".into(), json!("src/main.rs"));
    let _ = payload.insert("cursor".into(), json!(42));
    router.send(MessageKind::Status, payload.clone()).unwrap();

    // echo the exact frame back
    let frame = recv_frame(&mut server.inbound).await;
    let sent: Envelope = serde_json::from_str(&frame).unwrap();
    server
        .commands
        .send(ServerCommand::Frame(frame))
        .await
        .unwrap();

    wait_until(|| count.load(Ordering::SeqCst) == 1).await;
    let received = seen.lock()[0].clone();
    assert_eq!(received, sent);
    assert_eq!(received.kind, MessageKind::Status);
    assert_eq!(received.data, payload);
}

#[tokio::test]
async fn replacing_handlers_affects_later_messages_only() {
    let server = boot_server().await;
    let observed = Observed::new();
    let router = router_for(&server.url, "abc", &observed);
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    router.register_handlers(
        HandlerTable::new().on(MessageKind::Pong, capturing_handler(&first, &seen)),
    );
    router.connect().await.unwrap();

    let pong = r#"{"kind":"PONG","data":{},"timestamp":1}"#;
    server
        .commands
        .send(ServerCommand::Frame(pong.into()))
        .await
        .unwrap();
    wait_until(|| first.load(Ordering::SeqCst) == 1).await;

    router.register_handlers(
        HandlerTable::new().on(MessageKind::Pong, capturing_handler(&second, &seen)),
    );
    server
        .commands
        .send(ServerCommand::Frame(pong.into()))
        .await
        .unwrap();
    wait_until(|| second.load(Ordering::SeqCst) == 1).await;
    assert_eq!(first.load(Ordering::SeqCst), 1);
}
