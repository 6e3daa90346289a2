//! Block-aware response cache.
//!
//! Results are cached according to how long they stay valid:
//!
//! ```text
//! ┌──────────┬──────────────────────────────────────┬───────────────────────┐
//! │ Strategy │ Valid for                            │ Keyed by              │
//! ├──────────┼──────────────────────────────────────┼───────────────────────┤
//! │ Perma    │ ever (content-addressed lookups)     │ identifier            │
//! │ Block    │ the resolved block                   │ block, identifier     │
//! │ Fork     │ the resolved block, state queries    │ block, identifier     │
//! │ Never    │ not cached                           │ n/a                   │
//! └──────────┴──────────────────────────────────────┴───────────────────────┘
//! ```
//!
//! A request's block tag is resolved before lookup: `latest` (or a missing tag)
//! becomes the tracker's current block, `earliest` becomes block 0 and `pending`
//! bypasses the cache entirely. The identifier is the method plus the params
//! without the block tag, so `latest` and the equivalent hex number share an
//! entry.

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    collections::HashMap,
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tracing::{debug, trace};

use crate::{
    chain::BlockTracker,
    config::BlockCacheConfig,
    provider::errors::ProviderError,
    types::{JsonRpcRequest, JsonRpcResponse},
    utils::{BlockRef, BlockTag},
};

use super::{Middleware, Next};

/// Hash of a transaction that has not been mined.
const ZERO_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// How long a method's result stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    Perma,
    Block,
    Fork,
    Never,
}

impl CacheStrategy {
    #[must_use]
    pub fn for_method(method: &str) -> Self {
        match method {
            "web3_clientVersion" |
            "web3_sha3" |
            "eth_protocolVersion" |
            "eth_getBlockTransactionCountByHash" |
            "eth_getUncleCountByBlockHash" |
            "eth_getCode" |
            "eth_getBlockByHash" |
            "eth_getTransactionByHash" |
            "eth_getTransactionByBlockHashAndIndex" |
            "eth_getTransactionReceipt" |
            "eth_getUncleByBlockHashAndIndex" |
            "eth_getCompilers" |
            "eth_compileLLL" |
            "eth_compileSolidity" |
            "eth_compileSerpent" |
            "shh_version" |
            "test_permaCache" => Self::Perma,

            "eth_getBlockByNumber" |
            "eth_getBlockTransactionCountByNumber" |
            "eth_getUncleCountByBlockNumber" |
            "eth_getTransactionByBlockNumberAndIndex" |
            "eth_getUncleByBlockNumberAndIndex" |
            "test_blockCache" => Self::Block,

            "net_version" |
            "eth_getBalance" |
            "eth_getStorageAt" |
            "eth_getTransactionCount" |
            "eth_call" |
            "eth_estimateGas" |
            "eth_getFilterLogs" |
            "eth_getLogs" |
            "test_forkCache" => Self::Fork,

            _ => Self::Never,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Perma => "perma",
            Self::Block => "block",
            Self::Fork => "fork",
            Self::Never => "never",
        }
    }
}

/// Position of the block-tag parameter for `method`, if it takes one.
#[must_use]
pub fn block_tag_param_index(method: &str) -> Option<usize> {
    match method {
        "eth_getBalance" | "eth_getCode" | "eth_getTransactionCount" | "eth_call" => Some(1),
        "eth_getStorageAt" => Some(2),
        "eth_getBlockByNumber" |
        "eth_getBlockTransactionCountByNumber" |
        "eth_getUncleCountByBlockNumber" |
        "eth_getTransactionByBlockNumberAndIndex" |
        "eth_getUncleByBlockNumberAndIndex" => Some(0),
        _ => None,
    }
}

/// Returns the block tag carried by `request`, if present and a string.
#[must_use]
pub fn block_tag_for_request(request: &JsonRpcRequest) -> Option<&str> {
    block_tag_param_index(&request.method)
        .and_then(|index| request.param(index))
        .and_then(Value::as_str)
}

/// Cache key for `request`: method plus params with the block tag removed.
#[must_use]
pub fn cache_identifier(request: &JsonRpcRequest) -> String {
    let params = match (&request.params, block_tag_param_index(&request.method)) {
        (Some(Value::Array(items)), Some(index)) if index < items.len() => {
            let mut items = items.clone();
            items.remove(index);
            Value::Array(items)
        }
        (Some(params), _) => params.clone(),
        (None, _) => Value::Array(Vec::new()),
    };
    format!("{}:{}", request.method, params)
}

/// Whether a response may be stored.
fn can_cache_response(method: &str, response: &JsonRpcResponse) -> bool {
    if response.is_error() {
        return false;
    }
    let Some(result) = &response.result else {
        return false;
    };
    if result.is_null() || result.as_str() == Some("<nil>") {
        return false;
    }
    if matches!(method, "eth_getTransactionByHash" | "eth_getTransactionReceipt") {
        // Unmined transactions have no block hash yet.
        return result
            .get("blockHash")
            .and_then(Value::as_str)
            .is_some_and(|hash| hash != ZERO_HASH);
    }
    true
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Number of blocks with at least one cached entry.
    pub block_entries: usize,
    pub perma_entries: usize,
}

/// Where an entry lives once the block tag is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Perma,
    Block(u64),
}

struct CacheStore {
    perma: LruCache<String, Value>,
    blocks: LruCache<u64, HashMap<String, Value>>,
}

impl CacheStore {
    fn get(&mut self, slot: Slot, identifier: &str) -> Option<Value> {
        match slot {
            Slot::Perma => self.perma.get(identifier).cloned(),
            Slot::Block(number) => {
                self.blocks.get(&number).and_then(|entries| entries.get(identifier)).cloned()
            }
        }
    }

    fn put(&mut self, slot: Slot, identifier: String, value: Value) {
        match slot {
            Slot::Perma => {
                self.perma.put(identifier, value);
            }
            Slot::Block(number) => {
                self.blocks.get_or_insert_mut(number, HashMap::new).insert(identifier, value);
            }
        }
    }

    /// Removes every block entry older than `oldest`.
    fn clear_before(&mut self, oldest: u64) -> usize {
        let stale: Vec<u64> =
            self.blocks.iter().map(|(number, _)| *number).filter(|n| *n < oldest).collect();
        for number in &stale {
            self.blocks.pop(number);
        }
        stale.len()
    }
}

/// Caches responses by method strategy and resolved block.
pub struct BlockCacheMiddleware {
    tracker: Arc<dyn BlockTracker>,
    store: Mutex<CacheStore>,
    max_blocks: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BlockCacheMiddleware {
    /// Creates a cache sized by `config`.
    ///
    /// Zero sizes are treated as one; [`ProviderConfig::validate`](crate::config::ProviderConfig::validate)
    /// rejects them before this point.
    #[must_use]
    pub fn new(tracker: Arc<dyn BlockTracker>, config: &BlockCacheConfig) -> Self {
        let max_blocks = NonZeroUsize::new(config.max_blocks).unwrap_or(NonZeroUsize::MIN);
        let max_perma = NonZeroUsize::new(config.max_perma_entries).unwrap_or(NonZeroUsize::MIN);

        Self {
            tracker,
            store: Mutex::new(CacheStore {
                perma: LruCache::new(max_perma),
                blocks: LruCache::new(max_blocks),
            }),
            max_blocks: max_blocks.get() as u64,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let store = self.store.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            block_entries: store.blocks.len(),
            perma_entries: store.perma.len(),
        }
    }

    /// Resolves where `request` would be cached.
    ///
    /// Returns `None` when the request must bypass the cache.
    async fn resolve_slot(
        &self,
        request: &JsonRpcRequest,
        strategy: CacheStrategy,
    ) -> Result<Option<Slot>, ProviderError> {
        match strategy {
            CacheStrategy::Never => return Ok(None),
            CacheStrategy::Perma => return Ok(Some(Slot::Perma)),
            CacheStrategy::Block | CacheStrategy::Fork => {}
        }

        let block = match block_tag_for_request(request) {
            None => BlockRef::Tag(BlockTag::Latest),
            Some(tag) => match BlockRef::parse(tag) {
                Some(block) => block,
                // Let the node report malformed tags.
                None => return Ok(None),
            },
        };

        let number = match block {
            BlockRef::Number(number) => number,
            BlockRef::Tag(BlockTag::Earliest) => 0,
            BlockRef::Tag(BlockTag::Latest) => {
                let latest = self.tracker.latest_block().await?;
                let oldest = latest.saturating_sub(self.max_blocks.saturating_sub(1));
                let removed = self.store.lock().clear_before(oldest);
                if removed > 0 {
                    trace!(removed = removed, oldest = oldest, "evicted stale cached blocks");
                }
                latest
            }
            BlockRef::Tag(BlockTag::Pending | BlockTag::Safe | BlockTag::Finalized) => {
                return Ok(None)
            }
        };

        Ok(Some(Slot::Block(number)))
    }
}

#[async_trait]
impl Middleware for BlockCacheMiddleware {
    fn name(&self) -> &'static str {
        "block_cache"
    }

    async fn handle(
        &self,
        request: JsonRpcRequest,
        next: Next<'_>,
    ) -> Result<JsonRpcResponse, ProviderError> {
        if request.skip_cache {
            return next.run(request).await;
        }

        let strategy = CacheStrategy::for_method(&request.method);
        let Some(slot) = self.resolve_slot(&request, strategy).await? else {
            return next.run(request).await;
        };

        let identifier = cache_identifier(&request);
        let cached = self.store.lock().get(slot, &identifier);
        if let Some(result) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(
                method = %request.method,
                strategy = strategy.as_str(),
                "block cache hit"
            );
            return Ok(JsonRpcResponse::success(result, request.id));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let method = request.method.clone();
        let response = next.run(request).await?;

        if can_cache_response(&method, &response) {
            if let Some(result) = &response.result {
                self.store.lock().put(slot, identifier, result.clone());
                trace!(method = %method, strategy = strategy.as_str(), "cached response");
            }
        }

        Ok(response)
    }
}
