//! Tests for the websocket transport
//!
//! Runs `WebSocketTransport` against `MockWebSocketServer`.

use serde_json::json;
use std::{sync::Arc, time::Duration};
use strata_core::{
    config::TransportConfig,
    transport::{Transport, TransportError, WebSocketTransport},
    types::JsonRpcRequest,
};

use crate::mock_infrastructure::{create_test_header, MockWebSocketServer};

async fn connect(server: &MockWebSocketServer) -> WebSocketTransport {
    WebSocketTransport::connect(&server.url(), &TransportConfig::default()).await.unwrap()
}

#[tokio::test]
async fn test_response_carries_caller_id() {
    let server = MockWebSocketServer::new().await.unwrap();
    server.respond("eth_chainId", json!("0x1")).await;
    let transport = connect(&server).await;

    let response = transport
        .send(JsonRpcRequest::new("eth_chainId", None, json!("caller-id")))
        .await
        .unwrap();

    assert_eq!(*response.id, json!("caller-id"));
    assert_eq!(response.result, Some(json!("0x1")));

    // The wire carried a transport-assigned numeric id instead.
    let received = server.received_requests().await;
    assert!(received[0]["id"].is_u64());
}

#[tokio::test]
async fn test_concurrent_requests_with_same_caller_id() {
    let server = MockWebSocketServer::new().await.unwrap();
    server.respond("eth_chainId", json!("0x1")).await;
    server.respond("net_version", json!("1")).await;
    let transport = Arc::new(connect(&server).await);

    let a = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            transport.send(JsonRpcRequest::new("eth_chainId", None, json!(1))).await
        })
    };
    let b = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            transport.send(JsonRpcRequest::new("net_version", None, json!(1))).await
        })
    };

    assert_eq!(a.await.unwrap().unwrap().result, Some(json!("0x1")));
    assert_eq!(b.await.unwrap().unwrap().result, Some(json!("1")));
    assert_eq!(transport.pending_requests(), 0);
}

#[tokio::test]
async fn test_node_error_is_a_response() {
    let server = MockWebSocketServer::new().await.unwrap();
    server.respond_with_error("eth_call", 3, "execution reverted").await;
    let transport = connect(&server).await;

    let response = transport
        .send(JsonRpcRequest::new("eth_call", Some(json!([{}, "latest"])), json!(1)))
        .await
        .unwrap();

    let error = response.error.unwrap();
    assert_eq!(error.code, 3);
    assert_eq!(error.message, "execution reverted");
}

#[tokio::test]
async fn test_notifications_are_broadcast() {
    let server = MockWebSocketServer::new().await.unwrap();
    let transport = connect(&server).await;
    let mut first = transport.notifications().unwrap();
    let mut second = transport.notifications().unwrap();

    // Make sure the server-side connection task is running.
    transport.send(JsonRpcRequest::new("net_version", None, json!(1))).await.unwrap();
    server.push_new_head("0xsub", 5);

    for rx in [&mut first, &mut second] {
        let notification =
            tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(notification.params.subscription, "0xsub");
        assert_eq!(notification.params.result, create_test_header(5));
    }
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockWebSocketServer::new().await.unwrap();
    server.ignore("eth_syncing").await;
    let config = TransportConfig { request_timeout_ms: 100, ..TransportConfig::default() };
    let transport = WebSocketTransport::connect(&server.url(), &config).await.unwrap();

    let result = transport.send(JsonRpcRequest::new("eth_syncing", None, json!(1))).await;

    assert_eq!(result.unwrap_err(), TransportError::Timeout);
    assert_eq!(transport.pending_requests(), 0);
}

#[tokio::test]
async fn test_abandoned_request_is_forgotten() {
    let server = MockWebSocketServer::new().await.unwrap();
    server.ignore("eth_getLogs").await;
    let transport = connect(&server).await;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        transport.send(JsonRpcRequest::new("eth_getLogs", None, json!(1))),
    )
    .await;

    assert!(abandoned.is_err(), "the node never answers");
    assert!(server.wait_for_method("eth_getLogs", Duration::from_secs(1)).await);
    assert_eq!(transport.pending_requests(), 0);
}

#[tokio::test]
async fn test_close_fails_pending_and_later_requests() {
    let server = MockWebSocketServer::new().await.unwrap();
    server.ignore("eth_syncing").await;
    let transport = Arc::new(connect(&server).await);

    let pending = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            transport.send(JsonRpcRequest::new("eth_syncing", None, json!(1))).await
        })
    };
    assert!(server.wait_for_method("eth_syncing", Duration::from_secs(2)).await);

    server.close_connections();

    assert_eq!(pending.await.unwrap().unwrap_err(), TransportError::Closed);
    assert!(transport.is_closed());

    let later = transport.send(JsonRpcRequest::new("eth_chainId", None, json!(2))).await;
    assert_eq!(later.unwrap_err(), TransportError::Closed);
}

#[tokio::test]
async fn test_connect_rejects_non_websocket_url() {
    let result = WebSocketTransport::connect("https://example.com", &TransportConfig::default()).await;
    assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
}
