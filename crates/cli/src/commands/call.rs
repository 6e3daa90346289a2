use async_trait::async_trait;
use serde_json::Value;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use strata_core::{
    config::ProviderConfig,
    transport::{Transport, TransportError, WebSocketTransport},
    types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse},
    ProviderBuilder,
};
use tokio::sync::broadcast;

use super::utils::{parse_json_arg, print_info, print_success, CliResult};

pub struct CallOptions {
    pub method: String,
    pub params: Option<String>,
    pub repeat: u32,
}

/// Counts the requests for one method that reach the node.
struct MethodCounter {
    inner: WebSocketTransport,
    method: String,
    calls: AtomicU64,
}

#[async_trait]
impl Transport for MethodCounter {
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        if request.method == self.method {
            self.calls.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.send(request).await
    }

    fn notifications(&self) -> Option<broadcast::Receiver<JsonRpcNotification>> {
        self.inner.notifications()
    }
}

pub async fn handle_call_command(config: ProviderConfig, options: CallOptions) -> CliResult<()> {
    let params = parse_json_arg(options.params.as_deref(), "params", "a JSON array", Value::is_array)?;

    print_info(&format!("Connecting to {}...", config.url));
    let counter = Arc::new(MethodCounter {
        inner: WebSocketTransport::connect(&config.url, &config.transport).await?,
        method: options.method.clone(),
        calls: AtomicU64::new(0),
    });

    let provider = ProviderBuilder::from_config(config)
        .transport(Arc::clone(&counter) as Arc<dyn Transport>)
        .build()
        .await?;

    for _ in 0..options.repeat.max(1) {
        let response = provider.request_method(&options.method, params.clone()).await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    let sent = options.repeat.max(1);
    let forwarded = counter.calls.load(Ordering::Relaxed);
    print_success(&format!(
        "{sent} request(s) sent, {forwarded} reached the node, {} served locally",
        u64::from(sent).saturating_sub(forwarded)
    ));
    if let Some(stats) = provider.cache_stats() {
        print_info(&format!("Block cache: {} hits, {} misses", stats.hits, stats.misses));
    }

    provider.shutdown().await;
    Ok(())
}
