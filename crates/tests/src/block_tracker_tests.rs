//! Tests for block trackers over scripted transports

use serde_json::json;
use std::{sync::Arc, time::Duration};
use strata_core::{
    chain::{BlockTracker, PollingBlockTracker, SubscribeBlockTracker, TrackerError},
    transport::TransportError,
};

use crate::mock_infrastructure::{create_test_header, wait_until, MockTransport};

fn subscribe_transport() -> Arc<MockTransport> {
    let transport = MockTransport::new();
    transport.respond("eth_blockNumber", json!("0x10"));
    transport.respond("eth_subscribe", json!("0xheads"));
    transport.respond("eth_unsubscribe", json!(true));
    transport
}

#[tokio::test]
async fn test_subscribe_tracker_starts_lazily() {
    let transport = subscribe_transport();
    let tracker = SubscribeBlockTracker::new(transport.clone());

    assert_eq!(tracker.current_block(), None);
    assert_eq!(transport.total(), 0);

    assert_eq!(tracker.latest_block().await.unwrap(), 16);
    assert_eq!(transport.methods(), vec!["eth_blockNumber", "eth_subscribe"]);
    assert_eq!(tracker.subscription_id().as_deref(), Some("0xheads"));

    // Idempotent.
    tracker.start().await.unwrap();
    tracker.latest_block().await.unwrap();
    assert_eq!(transport.total(), 2);
}

#[tokio::test]
async fn test_subscribe_tracker_follows_new_heads() {
    let transport = subscribe_transport();
    let tracker = SubscribeBlockTracker::new(transport.clone());
    let mut heads = tracker.subscribe_heads();
    tracker.start().await.unwrap();

    // Notifications for other subscriptions are ignored.
    transport.push_notification("0xother", create_test_header(99));
    transport.push_notification("0xheads", create_test_header(17));

    assert_eq!(heads.recv().await.unwrap().number, 16);
    let head = tokio::time::timeout(Duration::from_secs(1), heads.recv()).await.unwrap().unwrap();
    assert_eq!(head.number, 17);
    assert_eq!(head.header, Some(create_test_header(17)));
    assert_eq!(tracker.current_block(), Some(17));
}

#[tokio::test]
async fn test_subscribe_tracker_ignores_stale_heads() {
    let transport = subscribe_transport();
    let tracker = SubscribeBlockTracker::new(transport.clone());
    tracker.start().await.unwrap();

    transport.push_notification("0xheads", create_test_header(20));
    assert!(wait_until(Duration::from_secs(1), || tracker.current_block() == Some(20)).await);

    transport.push_notification("0xheads", create_test_header(18));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(tracker.current_block(), Some(20));
}

#[tokio::test]
async fn test_subscribe_tracker_stop_unsubscribes() {
    let transport = subscribe_transport();
    let tracker = SubscribeBlockTracker::new(transport.clone());
    tracker.start().await.unwrap();

    tracker.stop().await;

    assert_eq!(transport.methods().last().map(String::as_str), Some("eth_unsubscribe"));
    assert_eq!(transport.requests().last().unwrap().params, Some(json!(["0xheads"])));
    assert_eq!(tracker.subscription_id(), None);
}

#[tokio::test]
async fn test_subscribe_tracker_requires_notifications() {
    let transport = MockTransport::without_notifications();
    let tracker = SubscribeBlockTracker::new(transport.clone());

    assert_eq!(tracker.start().await.unwrap_err(), TrackerError::NotificationsUnsupported);
    assert_eq!(transport.total(), 0);
}

#[tokio::test]
async fn test_subscribe_tracker_reports_transport_failure() {
    let transport = MockTransport::new();
    transport.fail("eth_blockNumber", TransportError::Timeout);
    let tracker = SubscribeBlockTracker::new(transport);

    assert_eq!(
        tracker.latest_block().await.unwrap_err(),
        TrackerError::Transport(TransportError::Timeout)
    );
}

#[tokio::test]
async fn test_polling_tracker_fetches_headers() {
    let transport = MockTransport::new();
    transport.respond("eth_blockNumber", json!("0x2a"));
    transport.respond("eth_getBlockByNumber", create_test_header(42));

    let tracker = PollingBlockTracker::new(transport.clone(), Duration::from_millis(20));
    assert_eq!(tracker.latest_block().await.unwrap(), 42);

    let head = tracker.current_head().unwrap();
    assert_eq!(head.header, Some(create_test_header(42)));
    assert_eq!(
        transport.requests()[1].params,
        Some(json!(["0x2a", false])),
        "header is fetched for the polled number"
    );
}

#[tokio::test]
async fn test_polling_tracker_survives_header_failure() {
    let transport = MockTransport::new();
    transport.respond("eth_blockNumber", json!("0x7"));
    transport.fail("eth_getBlockByNumber", TransportError::Timeout);

    let tracker = PollingBlockTracker::new(transport, Duration::from_millis(20));

    assert_eq!(tracker.latest_block().await.unwrap(), 7);
    assert_eq!(tracker.current_head().unwrap().header, None);
}

#[tokio::test]
async fn test_subscribe_tracker_retries_after_failed_subscribe() {
    let transport = MockTransport::new();
    transport.respond("eth_blockNumber", json!("0x10"));
    transport.fail("eth_subscribe", TransportError::Timeout);
    let tracker = SubscribeBlockTracker::new(transport.clone());

    assert_eq!(
        tracker.latest_block().await.unwrap_err(),
        TrackerError::Transport(TransportError::Timeout)
    );
    assert_eq!(tracker.current_block(), None, "no head without a newHeads subscription");

    transport.respond("eth_subscribe", json!("0xheads"));
    assert_eq!(tracker.latest_block().await.unwrap(), 16);
    assert_eq!(tracker.subscription_id().as_deref(), Some("0xheads"));
    assert_eq!(transport.count("eth_subscribe"), 2);

    transport.push_notification("0xheads", create_test_header(17));
    assert!(wait_until(Duration::from_secs(1), || tracker.current_block() == Some(17)).await);
}

#[tokio::test]
async fn test_polling_tracker_reports_transport_failure() {
    let transport = MockTransport::new();
    transport.fail("eth_blockNumber", TransportError::ConnectionFailed("refused".to_string()));
    let tracker = PollingBlockTracker::new(transport.clone(), Duration::from_millis(50));

    let outcome = tokio::time::timeout(Duration::from_secs(2), tracker.latest_block())
        .await
        .expect("latest_block must not wait on a failing node");

    assert_eq!(
        outcome.unwrap_err(),
        TrackerError::Transport(TransportError::ConnectionFailed("refused".to_string()))
    );
    assert_eq!(tracker.current_block(), None);
}

#[tokio::test]
async fn test_polling_tracker_recovers_after_failure() {
    let transport = MockTransport::new();
    transport.fail("eth_blockNumber", TransportError::Timeout);
    let tracker = PollingBlockTracker::new(transport.clone(), Duration::from_millis(20));

    assert!(tracker.latest_block().await.is_err());

    transport.respond("eth_blockNumber", json!("0x5"));
    assert_eq!(tracker.latest_block().await.unwrap(), 5);
}
