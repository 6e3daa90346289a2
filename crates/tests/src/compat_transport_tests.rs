//! Tests for the transport compatibility wrapper
//!
//! A transport exposing only `send` must gain a callback-style send that
//! behaves identically; a transport with a native callback send must keep it.

use serde_json::json;
use std::sync::Arc;
use strata_core::{
    transport::{send_via_callback, CompatTransport, SendAsyncPath, Transport, TransportError},
    types::JsonRpcRequest,
};

use crate::mock_infrastructure::{manual_provider, MockTransport};

#[tokio::test]
async fn test_send_only_transport_is_aliased() {
    let transport = MockTransport::new();
    transport.respond("eth_chainId", json!("0x1"));
    let compat = CompatTransport::new(transport.clone());

    assert_eq!(compat.path(), SendAsyncPath::Aliased);

    let direct = compat.send(JsonRpcRequest::new("eth_chainId", None, json!(1))).await.unwrap();
    let via_callback =
        send_via_callback(&compat, JsonRpcRequest::new("eth_chainId", None, json!(1)))
            .await
            .unwrap();

    assert_eq!(direct, via_callback);
    assert_eq!(transport.count("eth_chainId"), 2);
    assert_eq!(transport.callback_sends(), 0);
}

#[tokio::test]
async fn test_native_callback_send_is_preserved() {
    let transport = MockTransport::with_native_callback();
    transport.respond("eth_chainId", json!("0x1"));
    let compat = CompatTransport::new(transport.clone());

    assert_eq!(compat.path(), SendAsyncPath::Native);

    send_via_callback(&compat, JsonRpcRequest::new("eth_chainId", None, json!(1))).await.unwrap();
    assert_eq!(transport.callback_sends(), 1);
}

#[tokio::test]
async fn test_aliased_errors_reach_callback() {
    let transport = MockTransport::new();
    transport.fail("eth_chainId", TransportError::Timeout);
    let compat = CompatTransport::new(transport);

    let result =
        send_via_callback(&compat, JsonRpcRequest::new("eth_chainId", None, json!(1))).await;
    assert_eq!(result.unwrap_err(), TransportError::Timeout);
}

/// The provider forwards through the callback convention, so both kinds of
/// transport must serve it the same way.
#[tokio::test]
async fn test_provider_works_over_both_transport_kinds() {
    for transport in [MockTransport::new(), MockTransport::with_native_callback()] {
        transport.respond("eth_gasPrice", json!("0x3b9aca00"));
        let (provider, _) = manual_provider(Arc::clone(&transport) as Arc<dyn Transport>, 1).await;

        let response = provider.request_method("eth_gasPrice", None).await.unwrap();
        assert_eq!(response.result, Some(json!("0x3b9aca00")));
        assert_eq!(transport.count("eth_gasPrice"), 1);
    }
}

#[tokio::test]
async fn test_native_transport_is_used_by_provider() {
    let transport = MockTransport::with_native_callback();
    let (provider, _) = manual_provider(transport.clone(), 1).await;

    assert_eq!(provider.transport().path(), SendAsyncPath::Native);
    provider.request_method("eth_gasPrice", None).await.unwrap();
    assert_eq!(transport.callback_sends(), 1);
}
