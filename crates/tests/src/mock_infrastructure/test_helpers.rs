//! Test Helper Functions and Utilities
//!
//! Common helpers for creating test data and assembling providers.

use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use strata_core::{
    chain::{BlockTracker, ManualBlockTracker},
    config::ProviderConfig,
    transport::Transport,
    Provider, ProviderBuilder,
};

/// Creates a single test log.
#[must_use]
pub fn create_test_log(block_number: u64, log_index: u64) -> Value {
    json!({
        "address": "0x0000000000000000000000000000000000000001",
        "blockNumber": format!("0x{:x}", block_number),
        "blockHash": format!("0x{:064x}", block_number),
        "logIndex": format!("0x{:x}", log_index),
        "transactionHash": format!("0x{:064x}", block_number * 100 + log_index),
        "transactionIndex": "0x0",
        "topics": [format!("0x{:064x}", log_index)],
        "data": "0x",
        "removed": false
    })
}

/// Creates a `newHeads`-style header.
#[must_use]
pub fn create_test_header(block_number: u64) -> Value {
    json!({
        "number": format!("0x{:x}", block_number),
        "hash": format!("0x{:064x}", block_number),
        "parentHash": format!("0x{:064x}", block_number.saturating_sub(1)),
        "timestamp": format!("0x{:x}", 1_600_000_000 + block_number),
        "gasLimit": "0x1c9c380",
        "gasUsed": "0x0",
        "baseFeePerGas": "0x7"
    })
}

/// Creates a test block response with `tx_count` transaction hashes.
#[must_use]
pub fn create_test_block(block_number: u64, tx_count: usize) -> Value {
    let mut block = create_test_header(block_number);
    let transactions: Vec<Value> = (0..tx_count)
        .map(|i| json!(format!("0x{:064x}", block_number * 1000 + i as u64)))
        .collect();
    block["transactions"] = Value::Array(transactions);
    block
}

/// Creates a mined transaction receipt.
#[must_use]
pub fn create_test_receipt(block_number: u64, tx_hash: &str) -> Value {
    json!({
        "transactionHash": tx_hash,
        "blockNumber": format!("0x{:x}", block_number),
        "blockHash": format!("0x{:064x}", block_number),
        "status": "0x1",
        "logs": []
    })
}

/// Builds a provider over `transport` whose head is driven by hand.
///
/// The returned tracker starts at `block_number` and issues no requests of
/// its own, so every request `transport` records came from the caller.
pub async fn manual_provider(
    transport: Arc<dyn Transport>,
    block_number: u64,
) -> (Provider, Arc<ManualBlockTracker>) {
    let tracker = Arc::new(ManualBlockTracker::at_block(block_number));
    let provider = ProviderBuilder::from_config(ProviderConfig::default())
        .transport(transport)
        .block_tracker(Arc::clone(&tracker) as Arc<dyn BlockTracker>)
        .build()
        .await
        .expect("provider over injected transport");
    (provider, tracker)
}

/// Polls `condition` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
