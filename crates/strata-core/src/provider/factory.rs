use std::sync::Arc;
use tracing::info;

use crate::{
    chain::{BlockTracker, PollingBlockTracker, SubscribeBlockTracker},
    config::{validate_ws_url, BlockTrackerKind, ProviderConfig},
    middleware::{
        BlockCacheMiddleware, Middleware, RpcEngine, SubscriptionMiddleware, TransportMiddleware,
    },
    transport::{CompatTransport, Transport, TransportError, WebSocketTransport},
};

use super::{errors::ProviderError, Provider};

/// Creates a provider connected to the websocket endpoint at `url`, using
/// default settings for everything else.
///
/// # Errors
///
/// Returns [`ProviderError::Transport`] with [`TransportError::InvalidUrl`] for
/// non-websocket URLs, or the connection error if the node is unreachable.
pub async fn create_provider(url: &str) -> Result<Provider, ProviderError> {
    ProviderBuilder::from_config(ProviderConfig::for_url(url)).build().await
}

/// Assembles a [`Provider`].
///
/// The transport and block tracker are created from the configuration unless
/// injected.
///
/// # Example
///
/// ```no_run
/// use strata_core::{config::ProviderConfig, provider::ProviderBuilder};
///
/// # async fn run() -> Result<(), strata_core::provider::ProviderError> {
/// let provider = ProviderBuilder::from_config(ProviderConfig::for_url("ws://127.0.0.1:8546"))
///     .build()
///     .await?;
///
/// let block = provider.request_method("eth_blockNumber", None).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ProviderBuilder {
    config: ProviderConfig,
    transport: Option<Arc<dyn Transport>>,
    block_tracker: Option<Arc<dyn BlockTracker>>,
}

impl ProviderBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: ProviderConfig) -> Self {
        Self { config, ..Self::default() }
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Uses `transport` instead of connecting to the configured URL.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Uses `block_tracker` instead of building one from the configuration.
    #[must_use]
    pub fn block_tracker(mut self, block_tracker: Arc<dyn BlockTracker>) -> Self {
        self.block_tracker = Some(block_tracker);
        self
    }

    /// Builds the provider.
    ///
    /// Middleware is pushed transport first, then block cache, then
    /// subscriptions, so subscriptions run first and the transport last.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] for invalid settings, or a transport
    /// error if the websocket connection cannot be established.
    pub async fn build(self) -> Result<Provider, ProviderError> {
        let Self { config, transport, block_tracker } = self;

        if transport.is_none() {
            validate_ws_url(&config.url)
                .map_err(|e| ProviderError::Transport(TransportError::InvalidUrl(e)))?;
        }
        config.validate().map_err(ProviderError::Config)?;

        let transport = match transport {
            Some(transport) => transport,
            None => Arc::new(WebSocketTransport::connect(&config.url, &config.transport).await?),
        };
        let compat = Arc::new(CompatTransport::new(transport));
        let raw: Arc<dyn Transport> = Arc::clone(&compat) as Arc<dyn Transport>;

        let block_tracker: Arc<dyn BlockTracker> = match (block_tracker, &config.block_tracker.kind) {
            (Some(tracker), _) => tracker,
            (None, BlockTrackerKind::Subscribe) => {
                Arc::new(SubscribeBlockTracker::new(Arc::clone(&raw)))
            }
            (None, BlockTrackerKind::Polling) => {
                let tracker =
                    PollingBlockTracker::new(Arc::clone(&raw), config.block_tracker.poll_interval());
                tracker.start();
                Arc::new(tracker)
            }
        };

        let block_cache = config.block_cache.enabled.then(|| {
            Arc::new(BlockCacheMiddleware::new(Arc::clone(&block_tracker), &config.block_cache))
        });
        let subscriptions = Arc::new(SubscriptionMiddleware::new(
            Arc::clone(&block_tracker),
            raw,
            config.transport.notification_buffer,
        ));

        let mut engine = RpcEngine::new();
        engine.push(Arc::new(TransportMiddleware::new(Arc::clone(&compat))));
        if let Some(cache) = &block_cache {
            engine.push(Arc::clone(cache) as Arc<dyn Middleware>);
        }
        engine.push(Arc::clone(&subscriptions) as Arc<dyn Middleware>);

        info!(
            url = %config.url,
            send_async = compat.path().as_str(),
            middleware = ?engine.execution_order(),
            "provider ready"
        );

        Ok(Provider::new(engine, compat, block_tracker, subscriptions, block_cache))
    }
}
