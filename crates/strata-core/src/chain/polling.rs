use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{broadcast, Mutex as AsyncMutex},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{transport::Transport, types::BlockHead, utils};

use super::{errors::TrackerError, request_value, state::BlockState, BlockTracker};

/// Follows the chain head by polling `eth_blockNumber`.
///
/// For every new number the header is fetched with `eth_getBlockByNumber` so
/// that listeners receive the same header payload a `newHeads` subscription
/// would deliver. If the header fetch fails the head is still published,
/// carrying only its number.
///
/// While no head is known, [`latest_block`](BlockTracker::latest_block) polls
/// once itself, so a failing node surfaces as an error instead of a wait.
pub struct PollingBlockTracker {
    transport: Arc<dyn Transport>,
    state: Arc<BlockState>,
    interval: Duration,
    poll_lock: Arc<AsyncMutex<()>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl PollingBlockTracker {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, interval: Duration) -> Self {
        Self {
            transport,
            state: Arc::new(BlockState::new()),
            interval,
            poll_lock: Arc::new(AsyncMutex::new(())),
            poller: Mutex::new(None),
        }
    }

    /// Spawns the polling task. Does nothing if already started.
    pub fn start(&self) {
        let mut poller = self.poller.lock();
        if poller.is_some() {
            return;
        }

        debug!(interval_ms = self.interval.as_millis() as u64, "starting block polling");
        *poller = Some(tokio::spawn(Self::poll_loop(
            Arc::clone(&self.transport),
            Arc::clone(&self.state),
            Arc::clone(&self.poll_lock),
            self.interval,
        )));
    }

    async fn poll_loop(
        transport: Arc<dyn Transport>,
        state: Arc<BlockState>,
        poll_lock: Arc<AsyncMutex<()>>,
        interval: Duration,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match Self::poll_once(transport.as_ref(), &state, &poll_lock).await {
                Ok(Some(number)) => debug!(block_number = number, "new head"),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "block poll failed"),
            }
        }
    }

    /// Performs one poll; returns the new block number if the head advanced.
    ///
    /// Polls are serialized so that a direct poll and the background loop never
    /// fetch the same header twice.
    async fn poll_once(
        transport: &dyn Transport,
        state: &BlockState,
        poll_lock: &AsyncMutex<()>,
    ) -> Result<Option<u64>, TrackerError> {
        let _guard = poll_lock.lock().await;
        let value = request_value(transport, "eth_blockNumber", json!([])).await?;
        let number = utils::quantity(&value)
            .ok_or_else(|| TrackerError::InvalidBlock(format!("block number {value}")))?;

        if state.current_block().is_some_and(|current| number <= current) {
            return Ok(None);
        }

        let head = match request_value(
            transport,
            "eth_getBlockByNumber",
            json!([utils::to_quantity(number), false]),
        )
        .await
        {
            Ok(header) => BlockHead::from_header(&header).unwrap_or(BlockHead::from_number(number)),
            Err(e) => {
                debug!(block_number = number, error = %e, "header fetch failed");
                BlockHead::from_number(number)
            }
        };

        Ok(state.update(head).then_some(number))
    }
}

#[async_trait]
impl BlockTracker for PollingBlockTracker {
    fn current_block(&self) -> Option<u64> {
        self.state.current_block()
    }

    fn current_head(&self) -> Option<BlockHead> {
        self.state.current_head()
    }

    async fn latest_block(&self) -> Result<u64, TrackerError> {
        if let Some(number) = self.state.current_block() {
            return Ok(number);
        }
        Self::poll_once(self.transport.as_ref(), &self.state, &self.poll_lock).await?;
        self.start();
        self.state.wait_for_block().await
    }

    fn subscribe_heads(&self) -> broadcast::Receiver<BlockHead> {
        self.state.subscribe()
    }

    async fn stop(&self) {
        let poller = self.poller.lock().take();
        if let Some(handle) = poller {
            handle.abort();
        }
    }
}

impl Drop for PollingBlockTracker {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
    }
}
