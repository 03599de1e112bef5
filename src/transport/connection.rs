//! WebSocket connection and event loop.
//!
//! This module multiplexes every session over one WebSocket, correlating
//! responses to commands by id and routing events to subscribers.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames (responses, events)
//! - Outgoing frames, written one at a time
//! - Failing every pending command when the socket goes away
//!
//! The correlation slot for a command is inserted by the caller before the
//! frame is queued, so a response can never overtake its slot. A caller that
//! stops waiting removes its slot; a late response is then discarded.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, to_string};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{CommandId, SessionId};
use crate::protocol::{Command, Incoming, Request};

use super::subscription::{EventStream, SubscriptionRegistry};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for command execution.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// An in-flight command awaiting its response.
struct PendingCommand {
    method: String,
    session_id: SessionId,
    tx: oneshot::Sender<Result<Value>>,
}

/// Map of command IDs to pending commands.
type CorrelationMap = FxHashMap<CommandId, PendingCommand>;

// ============================================================================
// LoopCommand
// ============================================================================

/// Internal commands for the event loop.
enum LoopCommand {
    /// Write a serialized request.
    Write { id: CommandId, text: String },
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// SlotGuard
// ============================================================================

/// Removes a correlation slot when the awaiting caller goes away.
struct SlotGuard<'a> {
    id: CommandId,
    correlation: &'a Mutex<CorrelationMap>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if self.correlation.lock().remove(&self.id).is_some() {
            trace!(command_id = %self.id, "Dropped abandoned correlation slot");
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Multiplexed WebSocket connection to the browser.
///
/// Cheap to clone; all clones share one socket and one event loop.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and can be shared across tasks.
/// Concurrent callers never block each other while awaiting responses.
pub struct Connection {
    /// Channel for sending frames to the event loop.
    command_tx: mpsc::UnboundedSender<LoopCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Event subscribers (shared with event loop).
    subscriptions: Arc<Mutex<SubscriptionRegistry>>,
    /// Next correlation id.
    next_id: Arc<AtomicU64>,
    /// Set once the event loop has stopped.
    closed: Arc<AtomicBool>,
    /// Default per-command deadline.
    command_timeout: Duration,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            correlation: Arc::clone(&self.correlation),
            subscriptions: Arc::clone(&self.subscriptions),
            next_id: Arc::clone(&self.next_id),
            closed: Arc::clone(&self.closed),
            command_timeout: self.command_timeout,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates a new connection from a WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    pub fn new<S>(ws_stream: WebSocketStream<S>, command_timeout: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let subscriptions = Arc::new(Mutex::new(SubscriptionRegistry::default()));
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlation),
            Arc::clone(&subscriptions),
            Arc::clone(&closed),
        ));

        Self {
            command_tx,
            correlation,
            subscriptions,
            next_id: Arc::new(AtomicU64::new(1)),
            closed,
            command_timeout,
        }
    }

    /// Sends a command and waits for its result with the default timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Protocol`] if the browser returned an error payload
    pub async fn send(&self, command: impl Into<Command>, session_id: &SessionId) -> Result<Value> {
        self.send_with_timeout(command, session_id, self.command_timeout)
            .await
    }

    /// Sends a command and waits for its result with a custom timeout.
    ///
    /// Dropping the returned future abandons the command: its slot is
    /// removed and a late response is discarded.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Protocol`] if the browser returned an error payload
    pub async fn send_with_timeout(
        &self,
        command: impl Into<Command>,
        session_id: &SessionId,
        request_timeout: Duration,
    ) -> Result<Value> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let command = command.into();
        let id = CommandId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let method = command.method().to_string();
        let text = to_string(&Request::new(id, session_id.clone(), command))?;

        let (tx, rx) = oneshot::channel();
        self.correlation.lock().insert(
            id,
            PendingCommand {
                method: method.clone(),
                session_id: session_id.clone(),
                tx,
            },
        );
        let _guard = SlotGuard {
            id,
            correlation: &self.correlation,
        };

        self.command_tx
            .send(LoopCommand::Write { id, text })
            .map_err(|_| Error::ConnectionClosed)?;

        trace!(command_id = %id, %method, %session_id, "Command queued");

        match timeout(request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                warn!(command_id = %id, %method, %session_id, "Command timed out");
                let timeout_ms = u64::try_from(request_timeout.as_millis()).unwrap_or(u64::MAX);
                Err(Error::request_timeout(id, method, timeout_ms))
            }
        }
    }

    /// Subscribes to events of one method.
    ///
    /// With `session` set, only events emitted by that session are
    /// delivered. The stream ends when the connection closes; on a closed
    /// connection it is returned already ended.
    #[must_use]
    pub fn subscribe(&self, method: &str, session: Option<SessionId>) -> EventStream {
        SubscriptionRegistry::subscribe(&self.subscriptions, method, session)
    }

    /// Returns the default per-command deadline.
    #[inline]
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Returns the number of pending commands.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes the socket.
    ///
    /// Pending commands fail with [`Error::ConnectionClosed`].
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(LoopCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<LoopCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        subscriptions: Arc<Mutex<SubscriptionRegistry>>,
        closed: Arc<AtomicBool>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming frames from the browser
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &correlation, &subscriptions);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Frames queued by callers
                command = command_rx.recv() => {
                    match command {
                        Some(LoopCommand::Write { id, text }) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                error!(command_id = %id, error = %e, "Failed to write command");
                                if let Some(pending) = correlation.lock().remove(&id) {
                                    let _ = pending.tx.send(Err(Error::connection(e.to_string())));
                                }
                                break;
                            }
                            trace!(command_id = %id, "Command sent");
                        }

                        Some(LoopCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        closed.store(true, Ordering::Release);
        command_rx.close();

        Self::fail_pending_commands(&correlation);
        subscriptions.lock().clear();

        debug!("Event loop terminated");
    }

    /// Handles an incoming text frame.
    fn handle_incoming_message(
        text: &str,
        correlation: &Mutex<CorrelationMap>,
        subscriptions: &Mutex<SubscriptionRegistry>,
    ) {
        match Incoming::parse(text) {
            Ok(Incoming::Response(response)) => {
                let pending = correlation.lock().remove(&response.id);

                match pending {
                    Some(pending) => {
                        let result = response.into_result(&pending.method, pending.session_id);
                        let _ = pending.tx.send(result);
                    }
                    None => {
                        debug!(command_id = %response.id, "Discarding response for unknown command");
                    }
                }
            }

            Ok(Incoming::Event(event)) => {
                let delivered = subscriptions.lock().dispatch(&event);
                trace!(
                    method = %event.method,
                    session_id = %event.session_id,
                    delivered,
                    "Event received"
                );
            }

            Err(e) => {
                let pending = Incoming::response_id(text).and_then(|id| correlation.lock().remove(&id));
                match pending {
                    Some(pending) => {
                        warn!(error = %e, method = %pending.method, "Unreadable response");
                        let _ = pending.tx.send(Err(e));
                    }
                    None => {
                        warn!(error = %e, "Failed to parse incoming message");
                    }
                }
            }
        }
    }

    /// Fails all pending commands with ConnectionClosed error.
    fn fail_pending_commands(correlation: &Mutex<CorrelationMap>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, command) in pending {
            let _ = command.tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending commands on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tokio::time::sleep;

    use crate::protocol::{RawCommand, RuntimeCommand};
    use crate::testing::{FakeBrowser, Reply};

    fn evaluate(expression: &str) -> RuntimeCommand {
        RuntimeCommand::Evaluate {
            expression: expression.to_string(),
            return_by_value: true,
            await_promise: false,
        }
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_COMMAND_TIMEOUT.as_secs(), 30);
    }

    #[tokio::test]
    async fn test_out_of_order_responses_reach_their_callers() {
        let (_browser, connection) = FakeBrowser::start(|request| {
            let expression = request.params["expression"].as_str().unwrap_or_default();
            let delay = if expression == "slow" { 80 } else { 5 };
            Reply::Delayed(
                Duration::from_millis(delay),
                json!({ "result": { "type": "string", "value": expression } }),
            )
        })
        .await;

        let session = SessionId::top_level();
        let (slow, fast) = tokio::join!(
            connection.send(evaluate("slow"), &session),
            connection.send(evaluate("fast"), &session),
        );

        assert_eq!(slow.expect("slow")["result"]["value"], "slow");
        assert_eq!(fast.expect("fast")["result"]["value"], "fast");
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_ids_strictly_increase() {
        let (browser, connection) = FakeBrowser::start(|_| Reply::Result(json!({}))).await;
        let session = SessionId::top_level();

        for _ in 0..3 {
            connection.send(evaluate("1"), &session).await.expect("send");
        }

        let ids: Vec<u64> = browser.requests().iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_close_fails_pending_commands() {
        let (browser, connection) = FakeBrowser::start(|_| Reply::Ignore).await;
        let session = SessionId::top_level();

        let pending = {
            let connection = connection.clone();
            let session = session.clone();
            tokio::spawn(async move { connection.send(evaluate("never"), &session).await })
        };

        sleep(Duration::from_millis(30)).await;
        assert_eq!(connection.pending_count(), 1);

        browser.disconnect();

        let result = pending.await.expect("join");
        assert!(matches!(result, Err(Error::ConnectionClosed)));

        sleep(Duration::from_millis(10)).await;
        assert!(connection.is_closed());
        assert!(matches!(
            connection.send(evaluate("after"), &session).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_timeout_removes_slot_and_discards_late_response() {
        let (_browser, connection) = FakeBrowser::start(|_| {
            Reply::Delayed(Duration::from_millis(100), json!({ "late": true }))
        })
        .await;

        let err = connection
            .send_with_timeout(evaluate("x"), &SessionId::top_level(), Duration::from_millis(20))
            .await
            .expect_err("should time out");

        assert!(err.is_timeout());
        assert_eq!(connection.pending_count(), 0);

        // The late frame arrives and is dropped without disturbing the loop.
        sleep(Duration::from_millis(150)).await;
        assert!(!connection.is_closed());
    }

    #[tokio::test]
    async fn test_cancelled_caller_clears_slot() {
        let (_browser, connection) = FakeBrowser::start(|_| Reply::Ignore).await;
        let session = SessionId::top_level();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            connection.send(evaluate("x"), &session),
        )
        .await;

        assert!(abandoned.is_err());
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_detached_session_error_does_not_block_others() {
        let (_browser, connection) = FakeBrowser::start(|request| {
            if request.session_id.as_str() == "DETACHED" {
                Reply::Error {
                    code: -32001,
                    message: "Session with given id not found.".to_string(),
                }
            } else {
                Reply::Delayed(Duration::from_millis(20), json!({ "ok": true }))
            }
        })
        .await;

        let live = {
            let connection = connection.clone();
            tokio::spawn(async move { connection.send(evaluate("1"), &SessionId::new("LIVE")).await })
        };

        let err = connection
            .send(evaluate("1"), &SessionId::new("DETACHED"))
            .await
            .expect_err("detached session");

        assert!(err.is_session_not_found());
        assert!(err.to_string().contains("DETACHED"));
        assert!(live.await.expect("join").is_ok());
    }

    #[tokio::test]
    async fn test_events_delivered_in_order_with_session_filter() {
        let (browser, connection) = FakeBrowser::start(|_| Reply::Result(json!({}))).await;

        let mut all = connection.subscribe("Runtime.consoleAPICalled", None);
        let mut only_b =
            connection.subscribe("Runtime.consoleAPICalled", Some(SessionId::new("B")));

        for (n, session) in [(1, "A"), (2, "B"), (3, "A")] {
            browser.emit("Runtime.consoleAPICalled", json!({ "n": n }), session);
        }

        for expected in 1..=3 {
            let event = all.next().await.expect("event");
            assert_eq!(event.params["n"], expected);
        }

        let event = only_b.next().await.expect("event");
        assert_eq!(event.params["n"], 2);
        assert_eq!(event.session_id.as_str(), "B");
    }

    #[tokio::test]
    async fn test_structured_error_data_resolves_caller() {
        let (_browser, connection) = FakeBrowser::start(|_| {
            Reply::Frame(json!({
                "error": { "code": -32602, "message": "Invalid parameters", "data": { "detail": "x" } }
            }))
        })
        .await;

        let err = connection
            .send_with_timeout(evaluate("1"), &SessionId::new("S1"), Duration::from_secs(2))
            .await
            .expect_err("error reply");

        match err {
            Error::Protocol {
                code, session_id, ..
            } => {
                assert_eq!(code, -32602);
                assert_eq!(session_id.as_str(), "S1");
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreadable_response_resolves_caller() {
        let (_browser, connection) =
            FakeBrowser::start(|_| Reply::Frame(json!({ "error": "not an object" }))).await;

        let err = connection
            .send_with_timeout(evaluate("1"), &SessionId::top_level(), Duration::from_secs(2))
            .await
            .expect_err("malformed reply");

        assert!(matches!(err, Error::MalformedMessage { .. }));
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_after_close_is_ended() {
        let (browser, connection) = FakeBrowser::start(|_| Reply::Result(json!({}))).await;
        browser.disconnect();

        tokio::time::timeout(Duration::from_secs(2), async {
            while !connection.is_closed() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("connection closes");

        let mut stream = connection.subscribe("Target.targetDestroyed", None);
        let next = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("stream must not hang");
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_raw_command_round_trip() {
        let (browser, connection) =
            FakeBrowser::start(|_| Reply::Result(json!({ "frameTree": {} }))).await;

        let result = connection
            .send(
                RawCommand::new("Page.getFrameTree", json!({})),
                &SessionId::new("S1"),
            )
            .await
            .expect("send");

        assert!(result.get("frameTree").is_some());
        let recorded = browser.requests();
        assert_eq!(recorded[0].method, "Page.getFrameTree");
        assert_eq!(recorded[0].session_id.as_str(), "S1");
    }
}
