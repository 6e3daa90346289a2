//! Integration Tests for Strata
//!
//! This crate contains various test modules:
//!
//! - `provider_tests`: End-to-end behavior of the assembled provider (caching,
//!   local subscriptions, middleware order, error pass-through)
//! - `compat_transport_tests`: Both calling conventions over native and aliased transports
//! - `websocket_tests`: `WebSocketTransport` against a mock websocket node
//! - `block_tracker_tests`: Subscribe and polling trackers over scripted transports
//! - `middleware_chain_tests`: Custom middleware composed with the built-in stack
//! - `mock_infrastructure`: Reusable mock types for testing (websocket node, transport)
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! No external node is needed; every test runs against in-process mocks.


#[cfg(test)]
mod compat_transport_tests;

#[cfg(test)]
mod websocket_tests;

#[cfg(test)]
mod block_tracker_tests;


/// Mock infrastructure for testing
pub mod mock_infrastructure;
