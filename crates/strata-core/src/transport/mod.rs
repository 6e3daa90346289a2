//! Raw JSON-RPC transports.
//!
//! A [`Transport`] sends one request and resolves to one response. Transports that
//! also receive server pushes expose them through [`Transport::notifications`].
//!
//! Some callers still use the older fire-and-forget-with-callback convention
//! ([`CallbackSend`]). Transports may implement it natively; [`CompatTransport`]
//! decides once, at construction, whether to use the native implementation or to
//! alias it onto [`Transport::send`].
//!
//! # Module Organization
//!
//! - **[`websocket`]**: `tokio-tungstenite` transport with request/response correlation
//! - **[`compat`]**: The callback-send compatibility adapter
//! - **[`errors`]**: [`TransportError`]

pub mod compat;
pub mod errors;
pub mod websocket;

pub use compat::{CompatTransport, SendAsyncPath};
pub use errors::TransportError;
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};

use crate::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Callback invoked exactly once with the outcome of a callback-style send.
pub type ResponseCallback =
    Box<dyn FnOnce(Result<JsonRpcResponse, TransportError>) + Send + 'static>;

/// Request-in/response-out JSON-RPC transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and waits for its response.
    ///
    /// The returned response carries the caller's request id.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request could not be delivered or no
    /// response arrived.
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Returns a receiver for server-pushed `eth_subscription` notifications.
    ///
    /// Transports without a push channel return `None`.
    fn notifications(&self) -> Option<broadcast::Receiver<JsonRpcNotification>> {
        None
    }

    /// Returns the native callback-style send, if this transport has one.
    fn callback_send(self: Arc<Self>) -> Option<Arc<dyn CallbackSend>> {
        None
    }
}

/// The legacy fire-and-forget-with-callback calling convention.
pub trait CallbackSend: Send + Sync {
    /// Sends a request and invokes `callback` with the outcome.
    ///
    /// Returns immediately; the callback may run on another task.
    fn send_with_callback(&self, request: JsonRpcRequest, callback: ResponseCallback);
}

/// Drives a callback-style send to completion and returns its outcome.
///
/// # Errors
///
/// Returns the transport error delivered to the callback, or
/// [`TransportError::Closed`] if the callback was dropped without being invoked.
pub async fn send_via_callback(
    sender: &dyn CallbackSend,
    request: JsonRpcRequest,
) -> Result<JsonRpcResponse, TransportError> {
    let (tx, rx) = oneshot::channel();
    sender.send_with_callback(
        request,
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );
    rx.await.map_err(|_| TransportError::Closed)?
}
