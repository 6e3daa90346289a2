//! In-process transport mock.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use strata_core::{
    transport::{CallbackSend, ResponseCallback, Transport, TransportError},
    types::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse},
};
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
enum Reply {
    Result(Value),
    RpcError(JsonRpcError),
    Failure(TransportError),
}

/// Transport that answers from a per-method script and records every request.
///
/// Unscripted methods are answered with `null`. Built with
/// [`with_native_callback`](Self::with_native_callback) it also exposes a
/// native callback-style send, counted separately in
/// [`callback_sends`](Self::callback_sends).
pub struct MockTransport {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<JsonRpcRequest>>,
    callback_sends: AtomicUsize,
    native_callback: bool,
    notifications: Option<broadcast::Sender<JsonRpcNotification>>,
}

impl MockTransport {
    /// A transport with a notification channel and no native callback send.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(false, true))
    }

    /// A transport that also implements the callback convention natively.
    #[must_use]
    pub fn with_native_callback() -> Arc<Self> {
        Arc::new(Self::build(true, true))
    }

    /// A transport without a notification channel (HTTP-like).
    #[must_use]
    pub fn without_notifications() -> Arc<Self> {
        Arc::new(Self::build(false, false))
    }

    fn build(native_callback: bool, notifications: bool) -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            callback_sends: AtomicUsize::new(0),
            native_callback,
            notifications: notifications.then(|| broadcast::channel(256).0),
        }
    }

    /// Answers `method` with `result`.
    pub fn respond(&self, method: &str, result: Value) {
        self.replies.lock().insert(method.to_string(), Reply::Result(result));
    }

    /// Answers `method` with a JSON-RPC error object.
    pub fn respond_with_error(&self, method: &str, code: i32, message: &str) {
        let error = JsonRpcError { code, message: message.to_string(), data: None };
        self.replies.lock().insert(method.to_string(), Reply::RpcError(error));
    }

    /// Fails `method` at the transport level.
    pub fn fail(&self, method: &str, error: TransportError) {
        self.replies.lock().insert(method.to_string(), Reply::Failure(error));
    }

    /// Publishes a server-pushed notification.
    pub fn push_notification(&self, subscription: &str, result: Value) {
        if let Some(tx) = &self.notifications {
            let _ = tx.send(JsonRpcNotification::subscription(subscription, result));
        }
    }

    /// Every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<JsonRpcRequest> {
        self.requests.lock().clone()
    }

    /// Methods of every request received, in order.
    #[must_use]
    pub fn methods(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.method.clone()).collect()
    }

    /// Number of requests received for `method`.
    #[must_use]
    pub fn count(&self, method: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.method == method).count()
    }

    /// Total number of requests received.
    #[must_use]
    pub fn total(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests that arrived through the native callback send.
    #[must_use]
    pub fn callback_sends(&self) -> usize {
        self.callback_sends.load(Ordering::SeqCst)
    }

    fn answer(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.requests.lock().push(request.clone());
        let reply = self.replies.lock().get(&request.method).cloned();

        match reply {
            None => Ok(JsonRpcResponse::success(Value::Null, request.id)),
            Some(Reply::Result(result)) => Ok(JsonRpcResponse::success(result, request.id)),
            Some(Reply::RpcError(error)) => Ok(JsonRpcResponse {
                error: Some(error),
                ..JsonRpcResponse::from_request_id(&request)
            }),
            Some(Reply::Failure(error)) => Err(error),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.answer(request)
    }

    fn notifications(&self) -> Option<broadcast::Receiver<JsonRpcNotification>> {
        self.notifications.as_ref().map(broadcast::Sender::subscribe)
    }

    fn callback_send(self: Arc<Self>) -> Option<Arc<dyn CallbackSend>> {
        if self.native_callback {
            Some(self)
        } else {
            None
        }
    }
}

impl CallbackSend for MockTransport {
    fn send_with_callback(&self, request: JsonRpcRequest, callback: ResponseCallback) {
        self.callback_sends.fetch_add(1, Ordering::SeqCst);
        callback(self.answer(request));
    }
}
