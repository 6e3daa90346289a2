//! Local `eth_subscribe` handling.
//!
//! Subscriptions are served from the shared block tracker instead of being
//! forwarded to the node: one upstream head feed fans out to any number of
//! caller subscriptions.
//!
//! ```text
//!   BlockTracker ──heads──┬──► feed task (newHeads) ──┐
//!                         ├──► feed task (logs)  ─────┼──► notifications
//!                         └──► feed task (newHeads) ──┘    (broadcast)
//!                                    │
//!                                    └── eth_getBlockByNumber / eth_getLogs
//!                                        through the raw transport
//! ```

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    chain::{request_value, BlockTracker, TrackerError},
    provider::errors::ProviderError,
    transport::Transport,
    types::{error_codes, BlockHead, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse},
    utils,
};

use super::{Middleware, Next};

/// What a subscription emits.
#[derive(Debug, Clone)]
enum SubscriptionKind {
    NewHeads,
    Logs { filter: Map<String, Value> },
}

impl SubscriptionKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::NewHeads => "newHeads",
            Self::Logs { .. } => "logs",
        }
    }
}

/// Answers `eth_subscribe` and `eth_unsubscribe` locally.
///
/// Every other method is passed down the chain untouched. Notifications for
/// all subscriptions are published on one broadcast channel, see
/// [`notifications`](Self::notifications).
pub struct SubscriptionMiddleware {
    tracker: Arc<dyn BlockTracker>,
    transport: Arc<dyn Transport>,
    subscriptions: DashMap<String, JoinHandle<()>>,
    notifications: broadcast::Sender<JsonRpcNotification>,
}

impl SubscriptionMiddleware {
    /// Creates the middleware.
    ///
    /// `transport` is used for header and log lookups and must bypass the
    /// middleware engine.
    #[must_use]
    pub fn new(
        tracker: Arc<dyn BlockTracker>,
        transport: Arc<dyn Transport>,
        notification_buffer: usize,
    ) -> Self {
        let (notifications, _) = broadcast::channel(notification_buffer.max(1));
        Self { tracker, transport, subscriptions: DashMap::new(), notifications }
    }

    /// Returns a receiver for `eth_subscription` notifications of every
    /// subscription created through this middleware.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<JsonRpcNotification> {
        self.notifications.subscribe()
    }

    /// Number of live subscriptions. Feeds that ended on their own are pruned.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.prune_finished();
        self.subscriptions.len()
    }

    fn prune_finished(&self) {
        self.subscriptions.retain(|subscription_id, handle| {
            let live = !handle.is_finished();
            if !live {
                debug!(subscription_id = %subscription_id, "pruned ended subscription");
            }
            live
        });
    }

    /// Stops every subscription.
    pub fn destroy(&self) {
        let count = self.subscriptions.len();
        self.subscriptions.retain(|_, handle| {
            handle.abort();
            false
        });
        if count > 0 {
            info!(count = count, "subscriptions stopped");
        }
    }

    fn subscribe(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = Arc::clone(&request.id);

        let kind = match request.param(0).and_then(Value::as_str) {
            Some("newHeads") => SubscriptionKind::NewHeads,
            Some("logs") => match request.param(1) {
                None => SubscriptionKind::Logs { filter: Map::new() },
                Some(Value::Object(filter)) => SubscriptionKind::Logs { filter: filter.clone() },
                Some(_) => {
                    return JsonRpcResponse::error(
                        error_codes::INVALID_PARAMS,
                        "logs filter must be an object".to_string(),
                        id,
                    )
                }
            },
            Some(other) => {
                return JsonRpcResponse::error(
                    error_codes::INVALID_PARAMS,
                    format!("unsupported subscription type: {other}"),
                    id,
                )
            }
            None => {
                return JsonRpcResponse::error(
                    error_codes::INVALID_PARAMS,
                    "missing subscription type".to_string(),
                    id,
                )
            }
        };

        self.prune_finished();
        let subscription_id = format!("0x{}", Uuid::new_v4().simple());
        let feed = Feed {
            subscription_id: subscription_id.clone(),
            kind: kind.clone(),
            tracker: Arc::clone(&self.tracker),
            transport: Arc::clone(&self.transport),
            notifications: self.notifications.clone(),
            last_block: self.tracker.current_block(),
        };
        // Subscribe to heads before spawning so no head between now and the
        // task's first poll is lost.
        let heads = self.tracker.subscribe_heads();
        let handle = tokio::spawn(feed.run(heads));

        self.subscriptions.insert(subscription_id.clone(), handle);
        info!(subscription_id = %subscription_id, kind = kind.as_str(), "subscription created");

        JsonRpcResponse::success(json!(subscription_id), id)
    }

    fn unsubscribe(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = Arc::clone(&request.id);

        let Some(subscription_id) = request.param(0).and_then(Value::as_str) else {
            return JsonRpcResponse::error(
                error_codes::INVALID_PARAMS,
                "missing subscription id".to_string(),
                id,
            );
        };

        let removed = match self.subscriptions.remove(subscription_id) {
            Some((_, handle)) => {
                let live = !handle.is_finished();
                handle.abort();
                info!(subscription_id = %subscription_id, "subscription removed");
                live
            }
            None => false,
        };

        JsonRpcResponse::success(json!(removed), id)
    }
}

#[async_trait]
impl Middleware for SubscriptionMiddleware {
    fn name(&self) -> &'static str {
        "subscriptions"
    }

    async fn handle(
        &self,
        request: JsonRpcRequest,
        next: Next<'_>,
    ) -> Result<JsonRpcResponse, ProviderError> {
        match request.method.as_str() {
            "eth_subscribe" => Ok(self.subscribe(&request)),
            "eth_unsubscribe" => Ok(self.unsubscribe(&request)),
            _ => next.run(request).await,
        }
    }
}

impl Drop for SubscriptionMiddleware {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// State of one subscription's feeding task.
struct Feed {
    subscription_id: String,
    kind: SubscriptionKind,
    tracker: Arc<dyn BlockTracker>,
    transport: Arc<dyn Transport>,
    notifications: broadcast::Sender<JsonRpcNotification>,
    last_block: Option<u64>,
}

impl Feed {
    async fn run(mut self, mut heads: broadcast::Receiver<BlockHead>) {
        // Make sure the tracker is following the chain. Heads are consumed
        // while it starts up.
        let tracker = Arc::clone(&self.tracker);
        let warmup = tracker.latest_block();
        tokio::pin!(warmup);
        let mut warming = true;

        loop {
            tokio::select! {
                result = &mut warmup, if warming => {
                    warming = false;
                    if let Err(e) = result {
                        warn!(
                            subscription_id = %self.subscription_id,
                            error = %e,
                            "block tracker failed to start"
                        );
                    }
                }
                head = heads.recv() => match head {
                    Ok(head) => self.on_head(head).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            subscription_id = %self.subscription_id,
                            skipped = skipped,
                            "subscription lagged behind block tracker"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        debug!(subscription_id = %self.subscription_id, "subscription feed ended");
    }

    async fn on_head(&mut self, head: BlockHead) {
        let number = head.number;
        let result = match &self.kind {
            SubscriptionKind::NewHeads => self.emit_head(head).await,
            SubscriptionKind::Logs { filter } => {
                let from = self.last_block.map_or(number, |last| (last + 1).min(number));
                self.emit_logs(filter, from, number).await
            }
        };
        match result {
            Ok(()) => self.last_block = Some(number),
            Err(e) => {
                // Keep the range open so the next head re-covers this block.
                if self.last_block.is_none() {
                    self.last_block = number.checked_sub(1);
                }
                warn!(
                    subscription_id = %self.subscription_id,
                    block_number = number,
                    error = %e,
                    "failed to build subscription notification"
                );
            }
        }
    }

    async fn emit_head(&self, head: BlockHead) -> Result<(), TrackerError> {
        let header = match head.header {
            Some(header) => header,
            None => {
                let params = json!([head.number_hex(), false]);
                let header =
                    request_value(self.transport.as_ref(), "eth_getBlockByNumber", params).await?;
                if header.is_null() {
                    return Err(TrackerError::InvalidBlock(format!(
                        "block {} not found",
                        head.number
                    )));
                }
                header
            }
        };

        self.publish(header);
        Ok(())
    }

    async fn emit_logs(
        &self,
        filter: &Map<String, Value>,
        from: u64,
        to: u64,
    ) -> Result<(), TrackerError> {
        let mut filter = filter.clone();
        filter.insert("fromBlock".to_string(), json!(utils::to_quantity(from)));
        filter.insert("toBlock".to_string(), json!(utils::to_quantity(to)));

        let logs = request_value(
            self.transport.as_ref(),
            "eth_getLogs",
            Value::Array(vec![Value::Object(filter)]),
        )
        .await?;

        let Value::Array(logs) = logs else {
            return Err(TrackerError::InvalidBlock(format!("eth_getLogs returned {logs}")));
        };
        for log in logs {
            self.publish(log);
        }
        Ok(())
    }

    fn publish(&self, result: Value) {
        // Nobody listening is not an error.
        let _ = self
            .notifications
            .send(JsonRpcNotification::subscription(self.subscription_id.clone(), result));
    }
}
