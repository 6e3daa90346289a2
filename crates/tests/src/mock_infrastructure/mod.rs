//! Mock Infrastructure for Testing Strata
//!
//! This module provides reusable mock types for testing the provider without
//! a real Ethereum node.
//!
//! ## Components
//!
//! - `MockWebSocketServer`: A websocket node that answers requests from a script
//!   and pushes `eth_subscription` notifications on demand
//! - `MockTransport`: An in-process [`Transport`](strata_core::transport::Transport)
//!   that records every request, optionally with a native callback send
//! - Test helpers for common fixtures and provider assembly
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{manual_provider, MockTransport};
//!
//! let transport = MockTransport::new();
//! transport.respond("eth_chainId", json!("0x1"));
//!
//! let (provider, tracker) = manual_provider(transport.clone(), 100).await;
//! provider.request_method("eth_chainId", None).await?;
//! assert_eq!(transport.count("eth_chainId"), 1);
//! ```

pub mod test_helpers;
pub mod transport_mock;

pub use test_helpers::*;
pub use transport_mock::MockTransport;
pub use websocket_mock::MockWebSocketServer;
