//! Core type definitions for JSON-RPC requests, responses and subscription notifications.
//!
//! # Type Categories
//!
//! ## JSON-RPC Protocol Types
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`]: Protocol conformance
//! - [`JsonRpcNotification`], [`SubscriptionParams`]: `eth_subscription` push messages
//!
//! ## Chain Types
//! - [`BlockHead`]: A new chain head as observed by a block tracker
//!
//! # Performance Notes
//!
//! Request and response ids are held in an `Arc` so that echoing the caller's id
//! on a response (or restoring it after the transport rewrote it) is a pointer copy.

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, sync::Arc};

use crate::utils;

/// JSON-RPC protocol version constant to avoid repeated allocations.
/// Use `JSONRPC_VERSION_COW` for constructing requests/responses without allocation.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for JSON-RPC version - zero allocation for static usage.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// Method name carried by every subscription notification.
pub const SUBSCRIPTION_METHOD: &str = "eth_subscription";

/// Standard JSON-RPC error codes used by the middleware.
pub mod error_codes {
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// JSON-RPC 2.0 request structure.
///
/// # Fields
///
/// - `jsonrpc`: Protocol version (always "2.0")
/// - `method`: RPC method name (e.g., `eth_blockNumber`, `eth_subscribe`)
/// - `params`: Optional method parameters as JSON value
/// - `id`: Request identifier that must be echoed in the response
/// - `skip_cache`: Local-only flag; when set the block cache forwards the request untouched
///
/// # Example
///
/// ```
/// use strata_core::types::JsonRpcRequest;
/// use serde_json::json;
///
/// let request = JsonRpcRequest::new("eth_blockNumber", None, json!(1));
///
/// assert_eq!(request.method, "eth_blockNumber");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    pub id: Arc<serde_json::Value>,
    #[serde(skip)]
    pub skip_cache: bool,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with zero allocation for the version string.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        id: serde_json::Value,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            method: method.into(),
            params,
            id: Arc::new(id),
            skip_cache: false,
        }
    }

    /// Marks the request so that caching middleware always forwards it.
    #[must_use]
    pub fn with_skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    /// Returns the positional parameter at `index`, if params is an array.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<&serde_json::Value> {
        self.params.as_ref().and_then(|p| p.as_array()).and_then(|a| a.get(index))
    }

    /// Returns a copy of this request carrying a different id.
    #[must_use]
    pub fn with_id(&self, id: serde_json::Value) -> Self {
        Self { id: Arc::new(id), ..self.clone() }
    }
}

/// JSON-RPC 2.0 response structure.
///
/// A response contains either a `result` (success) or an `error` (failure), but never both.
///
/// # Example
///
/// ```
/// use strata_core::types::JsonRpcResponse;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let response = JsonRpcResponse::success(json!("0x1234"), Arc::new(json!(1)));
/// assert!(response.result.is_some());
/// assert!(!response.is_error());
///
/// let response =
///     JsonRpcResponse::error(-32600, "Invalid Request".to_string(), Arc::new(json!(1)));
/// assert!(response.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Arc<serde_json::Value>,
}

impl JsonRpcResponse {
    /// Creates a successful JSON-RPC response with zero allocation for the version string.
    #[must_use]
    pub fn success(result: serde_json::Value, id: Arc<serde_json::Value>) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, result: Some(result), error: None, id }
    }

    /// Creates an error JSON-RPC response with zero allocation for the version string.
    #[must_use]
    pub fn error(code: i32, message: String, id: Arc<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            result: None,
            error: Some(JsonRpcError { code, message, data: None }),
            id,
        }
    }

    /// Creates a new, empty response using a request's ID (cheap Arc clone).
    #[must_use]
    pub fn from_request_id(request: &JsonRpcRequest) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, result: None, error: None, id: Arc::clone(&request.id) }
    }

    /// Returns `true` if the response carries an error object.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Converts the response into its result, or the error object it carries.
    ///
    /// A response with neither field set yields `Ok(Value::Null)`, which is how
    /// nodes answer lookups for unknown blocks and transactions.
    ///
    /// # Errors
    ///
    /// Returns the embedded [`JsonRpcError`] when the response is an error response.
    pub fn into_result(self) -> Result<serde_json::Value, JsonRpcError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(serde_json::Value::Null),
        }
    }
}

/// JSON-RPC 2.0 error object.
///
/// Standard error codes follow the JSON-RPC 2.0 convention:
///
/// - `-32700`: Parse error (invalid JSON)
/// - `-32600`: Invalid request (malformed JSON-RPC)
/// - `-32601`: Method not found
/// - `-32602`: Invalid params
/// - `-32603`: Internal error
/// - `-32000` to `-32099`: Server-defined errors (implementation-specific)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Payload of an `eth_subscription` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionParams {
    pub subscription: String,
    pub result: serde_json::Value,
}

/// Server-pushed `eth_subscription` notification.
///
/// Notifications carry no `id`; they are routed by the `subscription` field of
/// their params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    pub params: SubscriptionParams,
}

impl JsonRpcNotification {
    /// Builds an `eth_subscription` notification for the given subscription id.
    #[must_use]
    pub fn subscription(subscription: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            method: SUBSCRIPTION_METHOD.to_string(),
            params: SubscriptionParams { subscription: subscription.into(), result },
        }
    }
}

/// A new chain head observed by a block tracker.
///
/// `header` holds the raw header JSON when the source delivered one (the
/// `newHeads` subscription does, `eth_blockNumber` polling does not).
#[derive(Debug, Clone, PartialEq)]
pub struct BlockHead {
    pub number: u64,
    pub hash: Option<String>,
    pub header: Option<serde_json::Value>,
}

impl BlockHead {
    /// Creates a head that only knows its block number.
    #[must_use]
    pub fn from_number(number: u64) -> Self {
        Self { number, hash: None, header: None }
    }

    /// Parses a head from a block or header JSON object.
    ///
    /// Returns `None` if the object has no valid hex `number` field.
    #[must_use]
    pub fn from_header(header: &serde_json::Value) -> Option<Self> {
        let number = header.get("number").and_then(utils::quantity)?;
        let hash = header.get("hash").and_then(|h| h.as_str()).map(str::to_string);
        Some(Self { number, hash, header: Some(header.clone()) })
    }

    /// Returns the block number as a `0x`-prefixed hex quantity.
    #[must_use]
    pub fn number_hex(&self) -> String {
        utils::to_quantity(self.number)
    }
}
