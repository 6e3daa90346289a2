use thiserror::Error;

/// Errors that can occur when talking to the node over the raw transport.
///
/// JSON-RPC error objects returned by the node are not transport errors; they
/// arrive as a successful [`JsonRpcResponse`](crate::types::JsonRpcResponse)
/// with its `error` field populated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// Request exceeded the configured timeout duration.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The endpoint URL is not a websocket URL.
    #[error("Invalid websocket URL: {0}")]
    InvalidUrl(String),

    /// The connection closed while the request was in flight, or before it was sent.
    #[error("Connection closed")]
    Closed,

    /// A frame from the node could not be parsed or did not match a request.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
