//! The provider: a middleware engine exposed as a transport.
//!
//! [`Provider`] is what callers hold. It accepts requests in either calling
//! convention, runs them through the middleware stack and returns the stack's
//! response. Because it implements [`Transport`] and [`CallbackSend`] itself,
//! a provider can stand in anywhere a raw transport is expected.

pub mod errors;
pub mod factory;

pub use errors::ProviderError;
pub use factory::{create_provider, ProviderBuilder};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    chain::BlockTracker,
    middleware::{BlockCacheMiddleware, CacheStats, RpcEngine, SubscriptionMiddleware},
    transport::{CallbackSend, CompatTransport, ResponseCallback, Transport, TransportError},
    types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse},
};

struct ProviderInner {
    engine: RpcEngine,
    transport: Arc<CompatTransport>,
    block_tracker: Arc<dyn BlockTracker>,
    subscriptions: Arc<SubscriptionMiddleware>,
    block_cache: Option<Arc<BlockCacheMiddleware>>,
    next_id: AtomicU64,
}

/// Caching, subscription-aware JSON-RPC provider.
///
/// Cloning is cheap; clones share the engine, the transport and every
/// subscription.
#[derive(Clone)]
pub struct Provider {
    inner: Arc<ProviderInner>,
}

impl Provider {
    pub(crate) fn new(
        engine: RpcEngine,
        transport: Arc<CompatTransport>,
        block_tracker: Arc<dyn BlockTracker>,
        subscriptions: Arc<SubscriptionMiddleware>,
        block_cache: Option<Arc<BlockCacheMiddleware>>,
    ) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                engine,
                transport,
                block_tracker,
                subscriptions,
                block_cache,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Runs `request` through the middleware stack.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged as [`ProviderError::Transport`].
    /// JSON-RPC errors from the node come back as `Ok` responses with `error` set.
    pub async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, ProviderError> {
        self.inner.engine.handle(request).await
    }

    /// Builds a request with the next local id and runs it through the stack.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn request_method(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<JsonRpcResponse, ProviderError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.request(JsonRpcRequest::new(method, params, Value::from(id))).await
    }

    /// Returns a receiver for notifications of subscriptions made through this
    /// provider.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<JsonRpcNotification> {
        self.inner.subscriptions.notifications()
    }

    #[must_use]
    pub fn block_tracker(&self) -> &Arc<dyn BlockTracker> {
        &self.inner.block_tracker
    }

    /// Returns the wrapped transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<CompatTransport> {
        &self.inner.transport
    }

    /// Middleware names in the order a request visits them.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&'static str> {
        self.inner.engine.execution_order()
    }

    /// Returns block cache counters, or `None` when caching is disabled.
    #[must_use]
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.inner.block_cache.as_ref().map(|cache| cache.stats())
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.subscription_count()
    }

    /// Cancels every subscription and stops the block tracker.
    pub async fn shutdown(&self) {
        self.inner.subscriptions.destroy();
        self.inner.block_tracker.stop().await;
        info!("provider shut down");
    }
}

#[async_trait]
impl Transport for Provider {
    /// Runs `request` through the stack.
    ///
    /// Failures that are not transport errors are answered with a JSON-RPC
    /// error response, as a node would.
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let id = Arc::clone(&request.id);
        match self.request(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                debug!(error = %e, "request failed inside provider");
                e.into_response(id)
            }
        }
    }

    fn notifications(&self) -> Option<broadcast::Receiver<JsonRpcNotification>> {
        Some(Provider::notifications(self))
    }

    fn callback_send(self: Arc<Self>) -> Option<Arc<dyn CallbackSend>> {
        Some(self)
    }
}

impl CallbackSend for Provider {
    fn send_with_callback(&self, request: JsonRpcRequest, callback: ResponseCallback) {
        let provider = self.clone();
        tokio::spawn(async move {
            callback(Transport::send(&provider, request).await);
        });
    }
}
