use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::{
    sync::{broadcast, Mutex as AsyncMutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    transport::Transport,
    types::{BlockHead, JsonRpcNotification},
    utils,
};

use super::{errors::TrackerError, request_value, state::BlockState, BlockTracker};

/// Follows the chain head through an `eth_subscribe` `newHeads` subscription.
///
/// Starting the tracker issues `eth_blockNumber` for the initial head and then
/// `eth_subscribe ["newHeads"]`. Start is lazy (the first
/// [`latest_block`](BlockTracker::latest_block) call triggers it) and idempotent.
/// A failed start, or a closed notification channel, leaves the tracker
/// stopped so that the next `latest_block` call starts it again.
pub struct SubscribeBlockTracker {
    transport: Arc<dyn Transport>,
    state: Arc<BlockState>,
    start_lock: AsyncMutex<()>,
    started: Arc<AtomicBool>,
    subscription_id: Mutex<Option<String>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SubscribeBlockTracker {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: Arc::new(BlockState::new()),
            start_lock: AsyncMutex::new(()),
            started: Arc::new(AtomicBool::new(false)),
            subscription_id: Mutex::new(None),
            listener: Mutex::new(None),
        }
    }

    /// Returns the node-side subscription id once started.
    #[must_use]
    pub fn subscription_id(&self) -> Option<String> {
        self.subscription_id.lock().clone()
    }

    /// Starts following `newHeads`. Does nothing if already started.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotificationsUnsupported`] if the transport has no
    /// push channel, or the error of the initial `eth_blockNumber` or
    /// `eth_subscribe` request.
    pub async fn start(&self) -> Result<(), TrackerError> {
        let _guard = self.start_lock.lock().await;
        if self.started.load(Ordering::Acquire) {
            return Ok(());
        }

        // Listen before subscribing so the first notification cannot be missed.
        let notifications =
            self.transport.notifications().ok_or(TrackerError::NotificationsUnsupported)?;

        let number = request_value(self.transport.as_ref(), "eth_blockNumber", json!([])).await?;
        let number = utils::quantity(&number)
            .ok_or_else(|| TrackerError::InvalidBlock(format!("block number {number}")))?;

        let subscription =
            request_value(self.transport.as_ref(), "eth_subscribe", json!(["newHeads"])).await?;
        let subscription_id = subscription
            .as_str()
            .ok_or_else(|| TrackerError::InvalidBlock(format!("subscription id {subscription}")))?
            .to_string();

        info!(
            block_number = number,
            subscription_id = %subscription_id,
            "block tracker subscribed to newHeads"
        );

        // Publish the head only once newHeads is followed.
        self.state.update(BlockHead::from_number(number));
        self.started.store(true, Ordering::Release);

        let handle = tokio::spawn(Self::follow_heads(
            notifications,
            subscription_id.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.started),
        ));

        *self.subscription_id.lock() = Some(subscription_id);
        *self.listener.lock() = Some(handle);
        Ok(())
    }

    /// Consumes `newHeads` notifications for `subscription_id` until the
    /// notification channel closes.
    async fn follow_heads(
        mut notifications: broadcast::Receiver<JsonRpcNotification>,
        subscription_id: String,
        state: Arc<BlockState>,
        started: Arc<AtomicBool>,
    ) {
        loop {
            match notifications.recv().await {
                Ok(notification) if notification.params.subscription == subscription_id => {
                    match BlockHead::from_header(&notification.params.result) {
                        Some(head) => {
                            let number = head.number;
                            if state.update(head) {
                                debug!(block_number = number, "new head");
                            }
                        }
                        None => {
                            warn!(
                                subscription_id = %subscription_id,
                                "newHeads notification without a block number"
                            );
                        }
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "block tracker lagged behind notifications");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!("notification channel closed, block tracker stopped");
                    started.store(false, Ordering::Release);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl BlockTracker for SubscribeBlockTracker {
    fn current_block(&self) -> Option<u64> {
        self.state.current_block()
    }

    fn current_head(&self) -> Option<BlockHead> {
        self.state.current_head()
    }

    async fn latest_block(&self) -> Result<u64, TrackerError> {
        if self.started.load(Ordering::Acquire) {
            if let Some(number) = self.state.current_block() {
                return Ok(number);
            }
        }
        self.start().await?;
        self.state.wait_for_block().await
    }

    fn subscribe_heads(&self) -> broadcast::Receiver<BlockHead> {
        self.state.subscribe()
    }

    async fn stop(&self) {
        let _guard = self.start_lock.lock().await;
        let listener = self.listener.lock().take();
        if let Some(handle) = listener {
            handle.abort();
        }

        let subscription_id = self.subscription_id.lock().take();
        if let Some(id) = subscription_id {
            if let Err(e) =
                request_value(self.transport.as_ref(), "eth_unsubscribe", json!([id])).await
            {
                debug!(error = %e, "failed to cancel newHeads subscription");
            }
        }
        self.started.store(false, Ordering::Release);
    }
}

impl Drop for SubscribeBlockTracker {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}
