//! # Strata Core
//!
//! Caching, subscription-aware JSON-RPC provider over a single websocket
//! connection.
//!
//! This crate provides:
//!
//! - **[`transport`]**: The websocket transport and the compatibility wrapper
//!   that gives every transport both calling conventions.
//!
//! - **[`chain`]**: Block trackers that follow the chain head and share it with
//!   the middleware.
//!
//! - **[`middleware`]**: The ordered middleware engine plus the block cache,
//!   subscription and transport middleware.
//!
//! - **[`provider`]**: The [`Provider`] handed to callers and the factory that
//!   assembles it.
//!
//! - **[`config`]**: Layered configuration (defaults, TOML file, environment).
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          Provider                          │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │ RpcEngine:  subscriptions ─► block cache ─► transport │  │
//! │  └──────┬───────────────────────┬──────────────────┬────┘  │
//! │         │                       │                  │       │
//! │  ┌──────▼───────────────────────▼──────┐   ┌───────▼────┐  │
//! │  │            BlockTracker             │   │   Compat   │  │
//! │  │  (subscribe / polling / manual)     ├──►│ Transport  │  │
//! │  └─────────────────────────────────────┘   └───────┬────┘  │
//! └────────────────────────────────────────────────────┼───────┘
//!                                                      ▼
//!                                             WebSocketTransport
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! # async fn run() -> Result<(), strata_core::ProviderError> {
//! let provider = strata_core::create_provider("ws://127.0.0.1:8546").await?;
//!
//! // Served from the block cache the second time.
//! provider.request_method("eth_getBlockByNumber", Some(serde_json::json!(["latest", false]))).await?;
//! provider.request_method("eth_getBlockByNumber", Some(serde_json::json!(["latest", false]))).await?;
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod middleware;
pub mod provider;
pub mod transport;
pub mod types;
pub mod utils;

pub use provider::{create_provider, Provider, ProviderBuilder, ProviderError};
