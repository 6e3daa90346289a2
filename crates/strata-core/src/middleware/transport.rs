use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::{
    provider::errors::ProviderError,
    transport::{send_via_callback, CompatTransport},
    types::{JsonRpcRequest, JsonRpcResponse},
};

use super::{Middleware, Next};

/// Terminal middleware that forwards every request to the node.
///
/// Requests go out through the callback-style send of a [`CompatTransport`], so
/// transports with only the modern `send` work unchanged. The response carries
/// the caller's id; transport errors are returned as-is.
pub struct TransportMiddleware {
    transport: Arc<CompatTransport>,
}

impl TransportMiddleware {
    #[must_use]
    pub fn new(transport: Arc<CompatTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Middleware for TransportMiddleware {
    fn name(&self) -> &'static str {
        "transport"
    }

    async fn handle(
        &self,
        request: JsonRpcRequest,
        _next: Next<'_>,
    ) -> Result<JsonRpcResponse, ProviderError> {
        let id = Arc::clone(&request.id);
        let method = request.method.clone();

        let mut response = send_via_callback(self.transport.as_ref(), request).await.map_err(|e| {
            debug!(method = %method, error = %e, "transport request failed");
            ProviderError::Transport(e)
        })?;

        response.id = id;
        Ok(response)
    }
}
