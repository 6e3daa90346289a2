use std::sync::Arc;

use crate::{
    chain::TrackerError,
    transport::TransportError,
    types::{error_codes, JsonRpcResponse},
};

/// Errors surfaced by [`Provider`](super::Provider) requests.
///
/// Node-side JSON-RPC errors are not represented here; they arrive as
/// responses with `error` set.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Passed through from the transport without modification.
    #[error(transparent)]
    Transport(TransportError),

    #[error("Block tracker error: {0}")]
    Tracker(TrackerError),

    #[error("No middleware handled method: {0}")]
    Unhandled(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<TransportError> for ProviderError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<TrackerError> for ProviderError {
    fn from(err: TrackerError) -> Self {
        // A tracker that failed on the wire reports the transport error itself.
        match err {
            TrackerError::Transport(inner) => Self::Transport(inner),
            other => Self::Tracker(other),
        }
    }
}

impl ProviderError {
    /// Converts a non-transport failure into a JSON-RPC error response.
    ///
    /// Returns the transport error back when `self` is one, since those have
    /// no JSON-RPC representation.
    ///
    /// # Errors
    ///
    /// Returns the inner [`TransportError`] for [`ProviderError::Transport`].
    pub fn into_response(self, id: Arc<serde_json::Value>) -> Result<JsonRpcResponse, TransportError> {
        let code = match &self {
            Self::Transport(err) => return Err(err.clone()),
            Self::Unhandled(_) => error_codes::METHOD_NOT_FOUND,
            Self::Tracker(_) | Self::Config(_) => error_codes::INTERNAL_ERROR,
        };
        Ok(JsonRpcResponse::error(code, self.to_string(), id))
    }
}
