use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

use super::{errors::TransportError, CallbackSend, ResponseCallback, Transport};

/// Which implementation serves callback-style sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendAsyncPath {
    /// The wrapped transport implements [`CallbackSend`] itself.
    Native,
    /// The wrapped transport has no callback send; calls are aliased onto `send`.
    Aliased,
}

impl SendAsyncPath {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Aliased => "aliased",
        }
    }
}

/// Aliases the callback convention onto [`Transport::send`].
struct AliasedSend {
    inner: Arc<dyn Transport>,
}

impl CallbackSend for AliasedSend {
    fn send_with_callback(&self, request: JsonRpcRequest, callback: ResponseCallback) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            callback(inner.send(request).await);
        });
    }
}

/// Transport wrapper guaranteeing that both calling conventions are available.
///
/// The capability check happens once in [`CompatTransport::new`]; every later
/// callback-style send goes straight to the implementation chosen there.
/// Callback-style sends on the aliased path spawn onto the current tokio runtime.
pub struct CompatTransport {
    inner: Arc<dyn Transport>,
    send_async: Arc<dyn CallbackSend>,
    path: SendAsyncPath,
}

impl CompatTransport {
    /// Wraps `inner`, aliasing the callback send onto `send` if it is missing.
    #[must_use]
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        let (send_async, path) = match Arc::clone(&inner).callback_send() {
            Some(native) => (native, SendAsyncPath::Native),
            None => {
                let aliased: Arc<dyn CallbackSend> =
                    Arc::new(AliasedSend { inner: Arc::clone(&inner) });
                (aliased, SendAsyncPath::Aliased)
            }
        };

        debug!(path = path.as_str(), "transport callback send resolved");

        Self { inner, send_async, path }
    }

    /// Returns which implementation serves callback-style sends.
    #[must_use]
    pub fn path(&self) -> SendAsyncPath {
        self.path
    }

    /// Returns the wrapped transport.
    #[must_use]
    pub fn inner(&self) -> &Arc<dyn Transport> {
        &self.inner
    }
}

#[async_trait]
impl Transport for CompatTransport {
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.inner.send(request).await
    }

    fn notifications(&self) -> Option<broadcast::Receiver<JsonRpcNotification>> {
        self.inner.notifications()
    }

    fn callback_send(self: Arc<Self>) -> Option<Arc<dyn CallbackSend>> {
        Some(self)
    }
}

impl CallbackSend for CompatTransport {
    fn send_with_callback(&self, request: JsonRpcRequest, callback: ResponseCallback) {
        self.send_async.send_with_callback(request, callback);
    }
}
