//! Local stand-ins for the game server: an HTTP stub that records every JSON
//! body it receives, and a single-connection WebSocket stub.

#![allow(dead_code)]

use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response as HandshakeResponse},
        Message,
    },
};

use ninetynine_cli::config::Config;

pub fn config_for(addr: SocketAddr) -> Config {
    Config::new(&format!("http://{addr}"), Duration::from_millis(300)).unwrap()
}

#[derive(Clone, Default)]
pub struct Recorded(Arc<Mutex<Vec<(String, Value)>>>);

impl Recorded {
    pub fn take(&self) -> Vec<(String, Value)> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

async fn handle(State(recorded): State<Recorded>, uri: Uri, Json(body): Json<Value>) -> Response {
    let path = uri.path().to_string();
    recorded.0.lock().unwrap().push((path.clone(), body.clone()));

    match path.as_str() {
        "/login" if body["password"] == "123456" => Json(json!({
            "userId": "uid-1",
            "username": "test",
            "email": body["email"],
            "gamestat": { "playCount": 0 }
        }))
        .into_response(),
        "/login" => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Incorrect password" })),
        )
            .into_response(),
        "/createroom" => Json(json!({
            "roomId": "123456789012",
            "createdAt": 1_700_000_000,
            "ownerId": body["userId"],
            "maxCapacity": 8,
            "maxSpectator": 16,
            "status": "waiting",
            "players": [body["userId"]],
            "spectators": []
        }))
        .into_response(),
        "/joinroom" => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Room is full" })),
        )
            .into_response(),
        "/plain" => (StatusCode::OK, "not json").into_response(),
        _ => Json(body).into_response(),
    }
}

pub async fn spawn_http() -> (SocketAddr, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new().fallback(handle).with_state(recorded.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, recorded)
}

/// An address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub struct WsStub {
    pub addr: SocketAddr,
    pub path: oneshot::Receiver<String>,
    pub frames: mpsc::UnboundedReceiver<Value>,
}

/// Accepts one socket. Answers `join`, `start` and `play` with game frames;
/// with `hang_up` it closes right after the join.
pub async fn spawn_ws(hang_up: bool) -> WsStub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (path_tx, path_rx) = oneshot::channel();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut path = String::new();
        let mut ws = accept_hdr_async(
            stream,
            |req: &Request, resp: HandshakeResponse| -> Result<HandshakeResponse, ErrorResponse> {
                path = req.uri().path().to_string();
                Ok(resp)
            },
        )
        .await
        .unwrap();
        let _ = path_tx.send(path);

        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            let frame: Value = serde_json::from_str(&text).unwrap();
            let _ = frames_tx.send(frame.clone());

            let reply = match frame["action"].as_str() {
                Some("join") => json!({
                    "error": "",
                    "action": format!("player {} joined", frame["username"].as_str().unwrap_or("?")),
                    "gameData": { "status": "waiting", "stackValue": 0, "maxStackValue": 99 }
                }),
                Some("start") => json!({ "error": "Not enough players", "action": "", "gameData": {} }),
                Some("play") => json!({
                    "error": "",
                    "action": "card played",
                    "gameData": {
                        "status": "playing",
                        "stackValue": frame["card"]["value"],
                        "maxStackValue": 99,
                        "playerCards": [{ "value": 1, "isSpecial": false }]
                    }
                }),
                _ => json!({ "error": "Invalid action" }),
            };
            if ws.send(Message::Text(reply.to_string())).await.is_err() {
                break;
            }

            if hang_up {
                let _ = ws.close(None).await;
            }
        }
    });

    WsStub {
        addr,
        path: path_rx,
        frames: frames_rx,
    }
}

/// Accepts one socket, reads the join frame, then drops the TCP stream with
/// no close handshake.
pub async fn spawn_ws_dropping() -> WsStub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (path_tx, path_rx) = oneshot::channel();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _ = path_tx.send(String::new());

        if let Some(Ok(Message::Text(text))) = ws.next().await {
            let _ = frames_tx.send(serde_json::from_str::<Value>(&text).unwrap());
        }
        drop(ws);
    });

    WsStub {
        addr,
        path: path_rx,
        frames: frames_rx,
    }
}

/// Everything the fmt subscriber writes, for asserting on log output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Routes this thread's logs into a buffer until the guard drops. Works with
/// `#[tokio::test]`, whose tasks all run on the test thread.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
