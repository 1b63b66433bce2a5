//! End-to-end WebSocket flow tests against a served app.
//!
//! Each test binds the full router to an ephemeral port and drives it
//! with real WebSocket clients.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use matchpoint::api;
use matchpoint::app_state::AppState;
use matchpoint::domain::{EventBus, IdentityStore, SessionRegistry};
use matchpoint::service::Coordinator;
use matchpoint::ws::handler::ws_handler;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_app() -> String {
    let event_bus = EventBus::new(1000);
    let coordinator = Arc::new(Coordinator::new(
        Arc::new(IdentityStore::new()),
        Arc::new(SessionRegistry::new()),
        event_bus.clone(),
    ));
    let app_state = AppState {
        coordinator,
        event_bus,
    };
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr.to_string()
}

async fn connect(addr: &str) -> WsClient {
    let Ok((client, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await else {
        panic!("websocket connect failed");
    };
    client
}

async fn send_command(client: &mut WsClient, payload: Value) {
    let envelope = json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "type": "command",
        "timestamp": chrono::Utc::now(),
        "payload": payload,
    });
    let Ok(()) = client.send(Message::Text(envelope.to_string())).await else {
        panic!("websocket send failed");
    };
}

/// Reads frames until an envelope of the given type arrives.
async fn next_of_type(client: &mut WsClient, msg_type: &str) -> Value {
    let deadline = Duration::from_secs(5);
    let Ok(found) = tokio::time::timeout(deadline, async {
        loop {
            let Some(Ok(Message::Text(text))) = client.next().await else {
                panic!("websocket closed while waiting for {msg_type}");
            };
            let Ok(envelope) = serde_json::from_str::<Value>(&text) else {
                panic!("non-JSON frame: {text}");
            };
            if envelope.get("type").and_then(Value::as_str) == Some(msg_type) {
                return envelope;
            }
        }
    })
    .await
    else {
        panic!("timed out waiting for {msg_type} envelope");
    };
    found
}

/// Reads frames until an event with the given `event_type` arrives,
/// returning its payload.
async fn next_event(client: &mut WsClient, event_type: &str) -> Value {
    let deadline = Duration::from_secs(5);
    let Ok(found) = tokio::time::timeout(deadline, async {
        loop {
            let envelope = next_of_type(client, "event").await;
            let Some(payload) = envelope.get("payload") else {
                panic!("event without payload");
            };
            if payload.get("event_type").and_then(Value::as_str) == Some(event_type) {
                return payload.clone();
            }
        }
    })
    .await
    else {
        panic!("timed out waiting for {event_type} event");
    };
    found
}

async fn identify(client: &mut WsClient, token: &str) -> String {
    send_command(
        client,
        json!({"command": "identify", "identity_token": token, "is_guest": true}),
    )
    .await;
    let response = next_of_type(client, "response").await;
    let Some(identity_id) = response
        .get("payload")
        .and_then(|p| p.get("identity_id"))
        .and_then(Value::as_str)
    else {
        panic!("identify response missing identity_id");
    };
    identity_id.to_string()
}

async fn request_match(client: &mut WsClient, identity_id: &str) -> Value {
    send_command(
        client,
        json!({"command": "request_match", "identity_id": identity_id}),
    )
    .await;
    let response = next_of_type(client, "response").await;
    let Some(payload) = response.get("payload") else {
        panic!("request_match response missing payload");
    };
    payload.clone()
}

#[tokio::test]
async fn two_clients_pair_and_exchange_state() {
    let addr = spawn_app().await;
    let mut client_a = connect(&addr).await;
    let mut client_b = connect(&addr).await;

    let id_a = identify(&mut client_a, "flow-tok-a").await;
    let id_b = identify(&mut client_b, "flow-tok-b").await;
    assert_ne!(id_a, id_b);

    let first = request_match(&mut client_a, &id_a).await;
    assert_eq!(first.get("status").and_then(Value::as_str), Some("queued"));

    let second = request_match(&mut client_b, &id_b).await;
    assert_eq!(second.get("status").and_then(Value::as_str), Some("paired"));

    let start_a = next_event(&mut client_a, "session_start").await;
    let start_b = next_event(&mut client_b, "session_start").await;
    assert_eq!(start_a.get("role").and_then(Value::as_str), Some("a"));
    assert_eq!(start_b.get("role").and_then(Value::as_str), Some("b"));
    let session_id = start_a.get("session_id").and_then(Value::as_str);
    assert!(session_id.is_some());
    assert_eq!(session_id, start_b.get("session_id").and_then(Value::as_str));
    let Some(session_id) = session_id else {
        panic!("missing session id");
    };

    // B moves; A receives the forwarded snapshot verbatim.
    send_command(
        &mut client_b,
        json!({
            "command": "state_update",
            "session_id": session_id,
            "identity_id": id_b,
            "state_snapshot": "pos:e2e4",
        }),
    )
    .await;
    let _ = next_of_type(&mut client_b, "response").await;

    let update = next_event(&mut client_a, "state_update").await;
    assert_eq!(
        update.get("state_snapshot").and_then(Value::as_str),
        Some("pos:e2e4")
    );
}

#[tokio::test]
async fn reconnect_resumes_with_latest_snapshot() {
    let addr = spawn_app().await;
    let mut client_a = connect(&addr).await;
    let mut client_b = connect(&addr).await;

    let id_a = identify(&mut client_a, "resume-tok-a").await;
    let id_b = identify(&mut client_b, "resume-tok-b").await;

    let _ = request_match(&mut client_a, &id_a).await;
    let _ = request_match(&mut client_b, &id_b).await;
    let start_a = next_event(&mut client_a, "session_start").await;
    let Some(session_id) = start_a.get("session_id").and_then(Value::as_str) else {
        panic!("missing session id");
    };
    let session_id = session_id.to_string();
    let _ = next_event(&mut client_b, "session_start").await;

    // B advances the state before A drops.
    send_command(
        &mut client_b,
        json!({
            "command": "state_update",
            "session_id": session_id,
            "identity_id": id_b,
            "state_snapshot": "pos:after-drop",
        }),
    )
    .await;
    let _ = next_of_type(&mut client_b, "response").await;
    let _ = next_event(&mut client_a, "state_update").await;

    // A drops; give the server a beat to process the close.
    let _ = client_a.close(None).await;
    drop(client_a);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Same token, fresh connection.
    let mut client_a2 = connect(&addr).await;
    let id_a2 = identify(&mut client_a2, "resume-tok-a").await;
    assert_eq!(id_a2, id_a);

    let outcome = request_match(&mut client_a2, &id_a2).await;
    assert_eq!(outcome.get("status").and_then(Value::as_str), Some("resumed"));
    assert_eq!(
        outcome.get("session_id").and_then(Value::as_str),
        Some(session_id.as_str())
    );

    let resumed = next_event(&mut client_a2, "session_start").await;
    assert_eq!(resumed.get("resumed").and_then(Value::as_bool), Some(true));
    assert_eq!(resumed.get("role").and_then(Value::as_str), Some("a"));
    assert_eq!(
        resumed.get("state_snapshot").and_then(Value::as_str),
        Some("pos:after-drop")
    );

    // B's side was untouched; updates still flow both ways.
    send_command(
        &mut client_b,
        json!({
            "command": "state_update",
            "session_id": session_id,
            "identity_id": id_b,
            "state_snapshot": "pos:post-resume",
        }),
    )
    .await;
    let update = next_event(&mut client_a2, "state_update").await;
    assert_eq!(
        update.get("state_snapshot").and_then(Value::as_str),
        Some("pos:post-resume")
    );
}

#[tokio::test]
async fn stale_session_reference_is_rejected() {
    let addr = spawn_app().await;
    let mut client = connect(&addr).await;
    let id = identify(&mut client, "stale-tok").await;

    send_command(
        &mut client,
        json!({
            "command": "state_update",
            "session_id": uuid::Uuid::new_v4(),
            "identity_id": id,
            "state_snapshot": "pos:never",
        }),
    )
    .await;
    let error = next_of_type(&mut client, "error").await;
    assert_eq!(
        error
            .get("payload")
            .and_then(|p| p.get("code"))
            .and_then(Value::as_u64),
        Some(2001)
    );
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let addr = spawn_app().await;
    let Ok(response) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("health request failed");
    };
    assert_eq!(response.status(), 200);
    let Ok(body) = response.json::<Value>().await else {
        panic!("health body not JSON");
    };
    assert_eq!(body.get("status").and_then(Value::as_str), Some("healthy"));
}
