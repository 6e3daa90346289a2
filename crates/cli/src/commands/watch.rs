use serde_json::{json, Value};
use strata_core::{config::ProviderConfig, ProviderBuilder};
use tokio::sync::broadcast::error::RecvError;

use super::utils::{parse_json_arg, print_error, print_info, CliError, CliResult};

pub struct WatchOptions {
    pub kind: String,
    pub filter: Option<String>,
    pub count: Option<usize>,
}

pub async fn handle_watch_command(config: ProviderConfig, options: WatchOptions) -> CliResult<()> {
    let filter =
        parse_json_arg(options.filter.as_deref(), "filter", "a JSON object", Value::is_object)?;
    let params = match filter {
        Some(filter) => json!([options.kind, filter]),
        None => json!([options.kind]),
    };

    print_info(&format!("Connecting to {}...", config.url));
    let provider = ProviderBuilder::from_config(config).build().await?;

    let mut notifications = provider.notifications();
    let response = provider.request_method("eth_subscribe", Some(params)).await?;
    let subscription_id = response.into_result().map_err(|e| {
        print_error(&format!("Subscription rejected: {e}"));
        CliError::InvalidInput(e.message)
    })?;
    print_info(&format!("Subscribed to {} as {subscription_id}", options.kind));

    let mut received = 0usize;
    while options.count.map_or(true, |limit| received < limit) {
        tokio::select! {
            notification = notifications.recv() => match notification {
                Ok(notification) => {
                    println!("{}", serde_json::to_string(&notification.params.result)?);
                    received += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    print_error(&format!("Output too slow, skipped {skipped} notifications"));
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    provider.request_method("eth_unsubscribe", Some(json!([subscription_id]))).await?;
    provider.shutdown().await;
    print_info(&format!("Received {received} notification(s)"));
    Ok(())
}
