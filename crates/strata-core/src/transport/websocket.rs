use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    net::TcpStream,
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::{
    config::{validate_ws_url, TransportConfig},
    types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, SUBSCRIPTION_METHOD},
};

use super::{errors::TransportError, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingMap = DashMap<u64, oneshot::Sender<Result<JsonRpcResponse, TransportError>>>;

/// Removes a request's pending entry however its `send` ends, including when
/// the caller drops the future mid-flight.
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    wire_id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.wire_id);
    }
}

/// JSON-RPC transport over a single websocket connection.
///
/// Requests are written with transport-assigned numeric ids so that concurrent
/// callers may reuse ids freely; the caller's id is restored on the response.
/// Frames without an id that carry `method = "eth_subscription"` are fanned out
/// to every [`Transport::notifications`] receiver.
///
/// The connection is not re-established once it closes: every in-flight and
/// later request fails with [`TransportError::Closed`].
pub struct WebSocketTransport {
    request_timeout: Duration,
    next_id: AtomicU64,
    pending: Arc<PendingMap>,
    outgoing: mpsc::UnboundedSender<Message>,
    notifications: broadcast::Sender<JsonRpcNotification>,
    closed: Arc<AtomicBool>,
    writer_handle: JoinHandle<()>,
    reader_handle: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Connects to `url` and starts the reader and writer tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if `url` is not a `ws://` or `wss://`
    /// URL, or [`TransportError::ConnectionFailed`] if the handshake fails.
    pub async fn connect(url: &str, config: &TransportConfig) -> Result<Self, TransportError> {
        validate_ws_url(url).map_err(TransportError::InvalidUrl)?;

        let ws_stream = Self::connect_websocket(url).await?;
        let (write, read) = ws_stream.split();

        let pending: Arc<PendingMap> = Arc::new(DashMap::new());
        let closed = Arc::new(AtomicBool::new(false));
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (notifications, _) = broadcast::channel(config.notification_buffer.max(1));

        let writer_handle = tokio::spawn(Self::write_loop(write, outgoing_rx, url.to_string()));
        let reader_handle = tokio::spawn(Self::read_loop(
            read,
            Arc::clone(&pending),
            notifications.clone(),
            Arc::clone(&closed),
            url.to_string(),
        ));

        Ok(Self {
            request_timeout: config.request_timeout(),
            next_id: AtomicU64::new(1),
            pending,
            outgoing,
            notifications,
            closed,
            writer_handle,
            reader_handle,
        })
    }

    /// Returns `true` once the socket has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the number of requests waiting for a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Establishes the websocket connection.
    ///
    /// Provides specific error messages for endpoints that answer the upgrade
    /// request with a plain HTTP status.
    async fn connect_websocket(ws_url: &str) -> Result<WsStream, TransportError> {
        tracing::info!(ws_url = ws_url, "connecting to websocket");

        match tokio_tungstenite::connect_async(ws_url).await {
            Ok((ws_stream, response)) => {
                tracing::info!(
                    ws_url = ws_url,
                    status = response.status().as_u16(),
                    "websocket connected successfully"
                );
                Ok(ws_stream)
            }
            Err(e) => {
                let error_msg = e.to_string();
                tracing::error!(ws_url = ws_url, error = %e, "websocket connection failed");

                if error_msg.contains("HTTP error: 200 OK") {
                    Err(TransportError::ConnectionFailed(format!(
                        "Server at {ws_url} returned 200 OK but does not support WebSocket protocol"
                    )))
                } else if error_msg.contains("HTTP error: 405") {
                    Err(TransportError::ConnectionFailed(format!(
                        "WebSocket method not allowed at {ws_url} (405 Method Not Allowed)"
                    )))
                } else if error_msg.contains("HTTP error: 403") {
                    Err(TransportError::ConnectionFailed(format!(
                        "WebSocket access forbidden at {ws_url} (403 Forbidden)"
                    )))
                } else {
                    Err(TransportError::ConnectionFailed(format!(
                        "WebSocket connection failed: {e}"
                    )))
                }
            }
        }
    }

    /// Forwards queued frames to the socket until the queue or the socket closes.
    async fn write_loop(
        mut write: SplitSink<WsStream, Message>,
        mut outgoing: mpsc::UnboundedReceiver<Message>,
        url: String,
    ) {
        while let Some(msg) = outgoing.recv().await {
            if let Err(e) = write.send(msg).await {
                tracing::error!(ws_url = %url, error = %e, "websocket send error");
                break;
            }
        }

        let _ = write.close().await;
        tracing::debug!(ws_url = %url, "websocket writer stopped");
    }

    /// Dispatches incoming frames until the socket closes, then fails every
    /// request still waiting for a response.
    async fn read_loop(
        mut read: SplitStream<WsStream>,
        pending: Arc<PendingMap>,
        notifications: broadcast::Sender<JsonRpcNotification>,
        closed: Arc<AtomicBool>,
        url: String,
    ) {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    Self::process_text_message(&text, &pending, &notifications, &url);
                }
                Ok(Message::Close(_)) => {
                    tracing::warn!(ws_url = %url, "websocket connection closed");
                    break;
                }
                Err(e) => {
                    tracing::error!(ws_url = %url, error = %e, "websocket error");
                    break;
                }
                _ => {}
            }
        }

        closed.store(true, Ordering::Release);

        let ids: Vec<u64> = pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, tx)) = pending.remove(&id) {
                let _ = tx.send(Err(TransportError::Closed));
            }
        }
    }

    /// Parses a text frame and routes it to a pending request or to the
    /// notification channel. Batched frames are routed element by element.
    fn process_text_message(
        text: &str,
        pending: &PendingMap,
        notifications: &broadcast::Sender<JsonRpcNotification>,
        url: &str,
    ) {
        let Ok(json) = serde_json::from_str::<serde_json::Value>(text) else {
            tracing::warn!(ws_url = url, message = text, "failed to parse json");
            return;
        };

        match json {
            serde_json::Value::Array(items) => {
                for item in items {
                    Self::route_frame(item, pending, notifications, url);
                }
            }
            item => Self::route_frame(item, pending, notifications, url),
        }
    }

    fn route_frame(
        frame: serde_json::Value,
        pending: &PendingMap,
        notifications: &broadcast::Sender<JsonRpcNotification>,
        url: &str,
    ) {
        if frame.get("method").and_then(|m| m.as_str()) == Some(SUBSCRIPTION_METHOD) {
            match serde_json::from_value::<JsonRpcNotification>(frame) {
                Ok(notification) => {
                    tracing::trace!(
                        ws_url = url,
                        subscription = %notification.params.subscription,
                        "received subscription notification"
                    );
                    // No receivers is not an error: nobody subscribed yet.
                    let _ = notifications.send(notification);
                }
                Err(e) => {
                    tracing::warn!(ws_url = url, error = %e, "malformed subscription notification");
                }
            }
            return;
        }

        let Some(wire_id) = frame.get("id").and_then(serde_json::Value::as_u64) else {
            tracing::debug!(ws_url = url, frame = %frame, "frame without a known id, ignoring");
            return;
        };

        let Some((_, tx)) = pending.remove(&wire_id) else {
            tracing::debug!(ws_url = url, id = wire_id, "response for unknown or expired request");
            return;
        };

        let outcome = serde_json::from_value::<JsonRpcResponse>(frame)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()));
        let _ = tx.send(outcome);
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let wire_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let caller_id = Arc::clone(&request.id);
        let text = serde_json::to_string(&request.with_id(serde_json::json!(wire_id)))?;

        let (tx, rx) = oneshot::channel();
        self.pending.insert(wire_id, tx);
        let _guard = PendingGuard { pending: &self.pending, wire_id };

        // The reader may have closed between the first check and the insert.
        if self.is_closed() || self.outgoing.send(Message::Text(text.into())).is_err() {
            return Err(TransportError::Closed);
        }

        tracing::trace!(method = %request.method, id = wire_id, "request sent");

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(outcome)) => outcome.map(|mut response| {
                response.id = caller_id;
                response
            }),
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => {
                tracing::warn!(
                    method = %request.method,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "request timed out"
                );
                Err(TransportError::Timeout)
            }
        }
    }

    fn notifications(&self) -> Option<broadcast::Receiver<JsonRpcNotification>> {
        Some(self.notifications.subscribe())
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.writer_handle.abort();
        self.reader_handle.abort();
    }
}
