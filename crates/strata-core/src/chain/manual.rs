use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::types::BlockHead;

use super::{errors::TrackerError, state::BlockState, BlockTracker};

/// Tracker whose head is set explicitly by its owner.
///
/// Issues no network traffic. Useful when the head is known from another source
/// (an existing subscription, a replayed chain) and in tests.
/// [`latest_block`](BlockTracker::latest_block) waits until the first
/// [`set_head`](Self::set_head) call.
#[derive(Default)]
pub struct ManualBlockTracker {
    state: BlockState,
}

impl ManualBlockTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker that already knows `number` as its head.
    #[must_use]
    pub fn at_block(number: u64) -> Self {
        let tracker = Self::new();
        tracker.state.update(BlockHead::from_number(number));
        tracker
    }

    /// Publishes a new head. Returns `false` if it is not newer than the current one.
    pub fn set_head(&self, head: BlockHead) -> bool {
        self.state.update(head)
    }

    /// Publishes a head carrying only a block number.
    pub fn set_block(&self, number: u64) -> bool {
        self.set_head(BlockHead::from_number(number))
    }
}

#[async_trait]
impl BlockTracker for ManualBlockTracker {
    fn current_block(&self) -> Option<u64> {
        self.state.current_block()
    }

    fn current_head(&self) -> Option<BlockHead> {
        self.state.current_head()
    }

    async fn latest_block(&self) -> Result<u64, TrackerError> {
        self.state.wait_for_block().await
    }

    fn subscribe_heads(&self) -> broadcast::Receiver<BlockHead> {
        self.state.subscribe()
    }
}
