//! In-process scripted browser for tests.
//!
//! [`FakeBrowser`] speaks the wire protocol over an in-memory duplex pipe.
//! A handler decides how each request is answered; every request is
//! recorded with its method, params and session.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::Role;

use crate::identifiers::SessionId;
use crate::transport::Connection;

/// A request as seen by the fake browser.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) id: u64,
    pub(crate) method: String,
    pub(crate) params: Value,
    pub(crate) session_id: SessionId,
}

/// How the fake browser answers one request.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Respond with a result.
    Result(Value),
    /// Respond with an error payload.
    Error { code: i64, message: String },
    /// Never respond.
    Ignore,
    /// Respond with a result after a delay.
    Delayed(Duration, Value),
    /// Respond with this frame body; `id` is filled in.
    Frame(Value),
}

impl Reply {
    /// Shorthand for the "object gone" error.
    pub(crate) fn stale_object() -> Self {
        Self::Error {
            code: -32000,
            message: "Could not find object with given id".to_string(),
        }
    }
}

enum Outbound {
    Text(String),
    Close,
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> Reply + Send + Sync>;

/// Scripted remote end.
pub(crate) struct FakeBrowser {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl FakeBrowser {
    /// Starts a fake browser and returns a client connection to it.
    pub(crate) async fn start<F>(handler: F) -> (Self, Connection)
    where
        F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        init_tracing();

        let (client_io, server_io) = tokio::io::duplex(1 << 20);
        let client_ws = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let server_ws = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;

        let (mut sink, mut stream) = server_ws.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                match frame {
                    Outbound::Text(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Outbound::Close => {
                        let _ = sink.send(Message::Close(None)).await;
                        let _ = sink.close().await;
                        break;
                    }
                }
            }
        });

        {
            let requests = Arc::clone(&requests);
            let outbound = outbound.clone();
            tokio::spawn(async move {
                while let Some(Ok(message)) = stream.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                        continue;
                    };

                    let request = RecordedRequest {
                        id: frame["id"].as_u64().unwrap_or_default(),
                        method: frame["method"].as_str().unwrap_or_default().to_string(),
                        params: frame.get("params").cloned().unwrap_or(Value::Null),
                        session_id: SessionId::new(frame["sessionId"].as_str().unwrap_or_default()),
                    };
                    requests.lock().push(request.clone());

                    let id = request.id;
                    match handler(&request) {
                        Reply::Result(result) => {
                            let _ = outbound.send(Outbound::Text(
                                json!({ "id": id, "result": result }).to_string(),
                            ));
                        }
                        Reply::Error { code, message } => {
                            let _ = outbound.send(Outbound::Text(
                                json!({ "id": id, "error": { "code": code, "message": message } })
                                    .to_string(),
                            ));
                        }
                        Reply::Ignore => {}
                        Reply::Frame(mut frame) => {
                            frame["id"] = json!(id);
                            let _ = outbound.send(Outbound::Text(frame.to_string()));
                        }
                        Reply::Delayed(delay, result) => {
                            let outbound = outbound.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(delay).await;
                                let _ = outbound.send(Outbound::Text(
                                    json!({ "id": id, "result": result }).to_string(),
                                ));
                            });
                        }
                    }
                }
            });
        }

        let connection = Connection::new(client_ws, Duration::from_secs(5));

        (Self { requests, outbound }, connection)
    }

    /// Returns every request received so far.
    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Returns requests with the given method.
    pub(crate) fn requests_for(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    /// Pushes an event frame.
    pub(crate) fn emit(&self, method: &str, params: Value, session: &str) {
        let mut frame = json!({ "method": method, "params": params });
        if !session.is_empty() {
            frame["sessionId"] = json!(session);
        }
        let _ = self.outbound.send(Outbound::Text(frame.to_string()));
    }

    /// Closes the socket from the browser side.
    pub(crate) fn disconnect(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Installs a test subscriber once; honours `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
