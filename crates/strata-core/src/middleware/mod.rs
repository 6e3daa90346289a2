//! Request middleware pipeline.
//!
//! Every request handed to a [`Provider`](crate::provider::Provider) walks an
//! ordered chain of [`Middleware`]. Each middleware may answer the request
//! itself, forward it with [`Next::run`] and post-process the response, or
//! forward it untouched.
//!
//! # Architecture
//!
//! The [`RpcEngine`] is a stack: the most recently pushed middleware runs first.
//! The provider pushes, in order, the transport, the block cache and the
//! subscription manager, which yields this execution order:
//!
//! ```text
//!   Incoming Request
//!        │
//!        ▼
//!   ┌─────────────────────────┐
//!   │  1. SUBSCRIPTIONS       │  eth_subscribe / eth_unsubscribe
//!   │     (pushed last)       │  answered locally, never forwarded
//!   └─────────────────────────┘
//!        │ other methods
//!        ▼
//!   ┌─────────────────────────┐
//!   │  2. BLOCK CACHE         │  cacheable methods keyed by resolved block
//!   │                         │  hit ──► cached response
//!   └─────────────────────────┘
//!        │ miss / uncacheable
//!        ▼
//!   ┌─────────────────────────┐
//!   │  3. TRANSPORT           │  the only network round-trip
//!   │     (pushed first)      │
//!   └─────────────────────────┘
//!        │
//!        ▼
//!   Response flows back up; the block cache stores it on the way.
//! ```
//!
//! # Error Handling
//!
//! Middleware never retries or reclassifies failures. A transport error
//! surfaces to the caller as [`ProviderError::Transport`] unchanged; JSON-RPC
//! error objects produced by the node or by a middleware (for example a
//! malformed `eth_subscribe`) are ordinary responses with `error` set.
//!
//! # Module Organization
//!
//! - **[`engine`]**: [`RpcEngine`], the ordered stack
//! - **[`transport`]**: [`TransportMiddleware`], the terminal network hop
//! - **[`block_cache`]**: [`BlockCacheMiddleware`] and its method classification
//! - **[`subscription`]**: [`SubscriptionMiddleware`], local `eth_subscribe` handling

pub mod block_cache;
pub mod engine;
pub mod subscription;
pub mod transport;

pub use block_cache::{BlockCacheMiddleware, CacheStats, CacheStrategy};
pub use engine::RpcEngine;
pub use subscription::SubscriptionMiddleware;
pub use transport::TransportMiddleware;

use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    provider::errors::ProviderError,
    types::{JsonRpcRequest, JsonRpcResponse},
};

/// A unit in the request pipeline.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Short name used in logs and by [`RpcEngine::execution_order`].
    fn name(&self) -> &'static str;

    /// Handles `request`, optionally delegating to the rest of the chain.
    ///
    /// # Errors
    ///
    /// Returns whatever error the rest of the chain produced, or this
    /// middleware's own [`ProviderError`].
    async fn handle(
        &self,
        request: JsonRpcRequest,
        next: Next<'_>,
    ) -> Result<JsonRpcResponse, ProviderError>;
}

/// Continuation over the middleware that have not run yet.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>]) -> Self {
        Self { chain }
    }

    /// Runs the rest of the chain.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unhandled`] if the chain ends without any
    /// middleware producing a response.
    pub async fn run(self, request: JsonRpcRequest) -> Result<JsonRpcResponse, ProviderError> {
        match self.chain.split_first() {
            Some((middleware, rest)) => middleware.handle(request, Next { chain: rest }).await,
            None => Err(ProviderError::Unhandled(request.method)),
        }
    }
}
