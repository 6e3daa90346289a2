//! Shared block-head state.
//!
//! `BlockState` is the single source of truth for the current chain head of one
//! tracker. The tracker that owns it is the only writer; middleware read it
//! through the [`BlockTracker`](super::BlockTracker) trait.

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::trace;

use crate::types::BlockHead;

use super::errors::TrackerError;

/// Capacity of the new-head broadcast channel.
const HEAD_CHANNEL_CAPACITY: usize = 256;

/// Current head plus change notification.
///
/// # Thread Safety
///
/// Reads of the current head are wait-free (`ArcSwapOption`). Updates are
/// serialized by a short mutex so that the monotonicity check and the store
/// happen atomically with respect to other writers.
///
/// # Example
///
/// ```
/// use strata_core::{chain::BlockState, types::BlockHead};
///
/// let state = BlockState::new();
/// assert_eq!(state.current_block(), None);
///
/// assert!(state.update(BlockHead::from_number(10)));
/// assert!(!state.update(BlockHead::from_number(9)));
/// assert_eq!(state.current_block(), Some(10));
/// ```
pub struct BlockState {
    head: ArcSwapOption<BlockHead>,
    update_lock: Mutex<()>,
    latest: watch::Sender<Option<u64>>,
    heads: broadcast::Sender<BlockHead>,
}

impl Default for BlockState {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockState {
    /// Creates an empty state; no block is known yet.
    #[must_use]
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        let (heads, _) = broadcast::channel(HEAD_CHANNEL_CAPACITY);
        Self {
            head: ArcSwapOption::empty(),
            update_lock: Mutex::new(()),
            latest,
            heads,
        }
    }

    /// Returns the current block number, if one has been observed.
    #[inline]
    #[must_use]
    pub fn current_block(&self) -> Option<u64> {
        self.head.load().as_ref().map(|head| head.number)
    }

    /// Returns the current head, if one has been observed.
    #[must_use]
    pub fn current_head(&self) -> Option<BlockHead> {
        self.head.load_full().map(|head| (*head).clone())
    }

    /// Records a new head.
    ///
    /// Only strictly newer block numbers are accepted. Accepted heads are
    /// broadcast to every [`subscribe`](Self::subscribe) receiver.
    ///
    /// # Returns
    ///
    /// `true` if the head was updated, `false` if it was not newer.
    pub fn update(&self, head: BlockHead) -> bool {
        let _guard = self.update_lock.lock();

        if let Some(current) = self.current_block() {
            if head.number <= current {
                return false;
            }
        }

        let number = head.number;
        self.head.store(Some(Arc::new(head.clone())));
        self.latest.send_replace(Some(number));
        // No receivers is fine: nobody is listening for heads yet.
        let _ = self.heads.send(head);

        trace!(block = number, "block head updated");
        true
    }

    /// Returns a receiver that observes every accepted head from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BlockHead> {
        self.heads.subscribe()
    }

    /// Waits until a head is known and returns its number.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Stopped`] if the state is torn down while waiting.
    pub async fn wait_for_block(&self) -> Result<u64, TrackerError> {
        let mut rx = self.latest.subscribe();
        let value = rx.wait_for(Option::is_some).await.map_err(|_| TrackerError::Stopped)?;
        let number = *value;
        number.ok_or(TrackerError::Stopped)
    }
}
