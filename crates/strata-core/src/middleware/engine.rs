use std::sync::Arc;
use tracing::trace;

use crate::{
    provider::errors::ProviderError,
    types::{JsonRpcRequest, JsonRpcResponse},
};

use super::{Middleware, Next};

/// Ordered middleware stack.
///
/// # Ordering
///
/// [`push`](Self::push) has stack semantics: the middleware pushed at position
/// N runs before the one pushed at position N-1. Requests therefore reach the
/// first-pushed middleware last, and responses pass back through the stack in
/// push order.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use std::sync::Arc;
/// use strata_core::{
///     middleware::{Middleware, Next, RpcEngine},
///     provider::ProviderError,
///     types::{JsonRpcRequest, JsonRpcResponse},
/// };
///
/// struct Named(&'static str);
///
/// #[async_trait]
/// impl Middleware for Named {
///     fn name(&self) -> &'static str {
///         self.0
///     }
///
///     async fn handle(
///         &self,
///         request: JsonRpcRequest,
///         next: Next<'_>,
///     ) -> Result<JsonRpcResponse, ProviderError> {
///         next.run(request).await
///     }
/// }
///
/// let mut engine = RpcEngine::new();
/// engine.push(Arc::new(Named("transport")));
/// engine.push(Arc::new(Named("block_cache")));
/// engine.push(Arc::new(Named("subscriptions")));
///
/// assert_eq!(engine.execution_order(), vec!["subscriptions", "block_cache", "transport"]);
/// ```
#[derive(Default)]
pub struct RpcEngine {
    /// Middleware in execution order.
    stack: Vec<Arc<dyn Middleware>>,
}

impl RpcEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `middleware` on top of the stack; it will run before every
    /// middleware pushed earlier.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.stack.insert(0, middleware);
    }

    /// Names of the middleware in the order a request visits them.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&'static str> {
        self.stack.iter().map(|middleware| middleware.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Runs `request` through the stack.
    ///
    /// The response always carries the request's id, whichever middleware
    /// produced it.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by the chain unchanged, or
    /// [`ProviderError::Unhandled`] if no middleware produced a response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, ProviderError> {
        let id = Arc::clone(&request.id);
        trace!(method = %request.method, "dispatching request");

        let mut response = Next::new(&self.stack).run(request).await?;
        response.id = id;
        Ok(response)
    }
}
