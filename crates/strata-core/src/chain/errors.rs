use thiserror::Error;

use crate::{transport::TransportError, types::JsonRpcError};

/// Errors raised while observing the chain head.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// The request to the node could not be completed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The node answered a tracker request with a JSON-RPC error.
    #[error("RPC error: {0}")]
    Rpc(JsonRpcError),

    /// The node answered with a value the tracker cannot interpret.
    #[error("Invalid block data: {0}")]
    InvalidBlock(String),

    /// The transport has no push channel, so `newHeads` cannot be followed.
    #[error("Transport does not deliver subscription notifications")]
    NotificationsUnsupported,

    /// The tracker was stopped before a block became known.
    #[error("Block tracker stopped")]
    Stopped,
}
