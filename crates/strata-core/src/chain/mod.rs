//! Block tracking.
//!
//! A [`BlockTracker`] keeps the current chain head and notifies listeners of new
//! heads. One tracker is created per provider and handed by `Arc` to every
//! component that needs freshness information:
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │   BlockTracker   │  WRITES head (own task)
//!                  │  (single inst)   │
//!                  └────────┬─────────┘
//!             Arc<dyn BlockTracker> shared by:
//!            ┌──────────────┴──────────────┐
//!            ▼                             ▼
//!  ┌──────────────────────┐   ┌────────────────────────────┐
//!  │ BlockCacheMiddleware │   │   SubscriptionMiddleware   │
//!  │ resolves `latest`,   │   │ feeds newHeads / logs      │
//!  │ evicts old blocks    │   │ subscriptions              │
//!  └──────────────────────┘   └────────────────────────────┘
//! ```
//!
//! Trackers talk to the node through the raw transport, never through the
//! middleware engine, so their traffic is neither cached nor intercepted.
//!
//! # Implementations
//!
//! - [`SubscribeBlockTracker`]: `eth_subscribe` to `newHeads`
//! - [`PollingBlockTracker`]: periodic `eth_blockNumber`
//! - [`ManualBlockTracker`]: advanced explicitly, no network traffic

pub mod errors;
pub mod manual;
pub mod polling;
pub mod state;
pub mod subscribe;

pub use errors::TrackerError;
pub use manual::ManualBlockTracker;
pub use polling::PollingBlockTracker;
pub use state::BlockState;
pub use subscribe::SubscribeBlockTracker;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    transport::Transport,
    types::{BlockHead, JsonRpcRequest},
};

/// Source of current-block information shared by the middleware.
#[async_trait]
pub trait BlockTracker: Send + Sync {
    /// Returns the current block number without waiting, if one is known.
    fn current_block(&self) -> Option<u64>;

    /// Returns the current head without waiting, if one is known.
    fn current_head(&self) -> Option<BlockHead>;

    /// Returns the latest block number, starting the tracker and waiting for
    /// the first head if none is known yet.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackerError`] if the tracker cannot be started.
    async fn latest_block(&self) -> Result<u64, TrackerError>;

    /// Returns a receiver observing every new head from now on.
    ///
    /// Subscribing does not start the tracker; call [`latest_block`](Self::latest_block)
    /// or the implementation's `start` for that.
    fn subscribe_heads(&self) -> broadcast::Receiver<BlockHead>;

    /// Stops following the chain. Idempotent.
    async fn stop(&self) {}
}

/// Sends `method` through `transport` and returns the result value.
///
/// JSON-RPC error responses become [`TrackerError::Rpc`].
pub(crate) async fn request_value(
    transport: &dyn Transport,
    method: &str,
    params: serde_json::Value,
) -> Result<serde_json::Value, TrackerError> {
    let request = JsonRpcRequest::new(method, Some(params), serde_json::json!(1));
    transport.send(request).await?.into_result().map_err(TrackerError::Rpc)
}
