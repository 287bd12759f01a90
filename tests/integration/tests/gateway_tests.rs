//! End-to-end tests for the gateway session against a mock gateway

use integration_tests::{message_create, CollectingSink, GatewayScenario, MockApi, MockGateway, ScriptedResponse};
use parley_common::ClientConfig;
use parley_core::{EventSink, Intents};
use parley_gateway::{GatewayClient, GatewayHandle, SessionStatus};
use parley_rest::RestDispatcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    _api: MockApi,
    gateway: MockGateway,
    sink: Arc<CollectingSink>,
    handle: GatewayHandle,
}

/// Wire up mock API + mock gateway + client with fast reconnects
async fn start(scenario: GatewayScenario) -> Harness {
    let api = MockApi::start().await.unwrap();
    let gateway = MockGateway::start(scenario).await.unwrap();
    api.set_default(ScriptedResponse::json(json!({ "url": gateway.url })));

    let config = ClientConfig::new("test-token")
        .with_api_url(api.base_url())
        .with_reconnect_delay(Duration::from_millis(100))
        .with_intents(Intents::GUILDS | Intents::GUILD_MESSAGES);
    let rest = RestDispatcher::new(&config);
    let sink = CollectingSink::new();
    let sink_dyn: Arc<dyn EventSink> = Arc::clone(&sink) as Arc<dyn EventSink>;
    let handle = GatewayClient::spawn(config, rest, sink_dyn);

    Harness {
        _api: api,
        gateway,
        sink,
        handle,
    }
}

async fn wait_for_status(handle: &GatewayHandle, status: SessionStatus, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if handle.status() == status {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.status() == status
}

#[tokio::test]
async fn test_hello_triggers_identify_and_ready() {
    let harness = start(GatewayScenario::default()).await;

    assert!(
        harness
            .sink
            .wait_for_events(1, Duration::from_secs(5))
            .await
    );
    assert!(wait_for_status(&harness.handle, SessionStatus::Ready, Duration::from_secs(5)).await);

    // Exactly one IDENTIFY, carrying credential, intents, and compress
    let identifies = harness.gateway.record.identifies.lock().clone();
    assert_eq!(identifies.len(), 1);
    assert_eq!(identifies[0]["token"], "test-token");
    assert_eq!(
        identifies[0]["intents"],
        (Intents::GUILDS | Intents::GUILD_MESSAGES).bitfield()
    );
    assert_eq!(identifies[0]["compress"], true);

    // READY reached the sink like any other dispatch
    let events = harness.sink.events();
    assert_eq!(events[0].0, "READY");
    assert_eq!(events[0].1, 1);

    harness.handle.disconnect(false).await;
    harness.handle.join().await;
}

#[tokio::test]
async fn test_dispatches_arrive_in_order_with_sequences() {
    let harness = start(GatewayScenario {
        dispatches_after_ready: vec![
            ("MESSAGE_CREATE".to_string(), message_create("one")),
            ("MESSAGE_CREATE".to_string(), message_create("two")),
            ("TYPING_START".to_string(), json!({"channel_id": "81384788765712384"})),
        ],
        ..GatewayScenario::default()
    })
    .await;

    assert!(
        harness
            .sink
            .wait_for_events(4, Duration::from_secs(5))
            .await
    );

    let events = harness.sink.events();
    let names: Vec<_> = events.iter().map(|(name, _, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec!["READY", "MESSAGE_CREATE", "MESSAGE_CREATE", "TYPING_START"]
    );

    // Receipt order matches the server's sequence numbers
    let sequences: Vec<_> = events.iter().map(|(_, seq, _)| *seq).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);

    assert_eq!(events[1].2["content"], "one");
    assert_eq!(events[2].2["content"], "two");

    harness.handle.disconnect(false).await;
    harness.handle.join().await;
}

#[tokio::test]
async fn test_compressed_stream_decodes_end_to_end() {
    let harness = start(GatewayScenario {
        compress: true,
        dispatches_after_ready: vec![
            ("MESSAGE_CREATE".to_string(), message_create("compressed payload")),
            ("MESSAGE_CREATE".to_string(), message_create("second compressed payload")),
        ],
        ..GatewayScenario::default()
    })
    .await;

    assert!(
        harness
            .sink
            .wait_for_events(3, Duration::from_secs(5))
            .await
    );

    let events = harness.sink.events();
    assert_eq!(events[1].2["content"], "compressed payload");
    assert_eq!(events[2].2["content"], "second compressed payload");

    harness.handle.disconnect(false).await;
    harness.handle.join().await;
}

#[tokio::test]
async fn test_resumable_close_leads_to_resume() {
    let harness = start(GatewayScenario {
        close_after_ready: Some(4000),
        ..GatewayScenario::default()
    })
    .await;

    // First connection identifies, gets closed resumably, and the
    // second connection resumes with the captured identity.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if !harness.gateway.record.resumes.lock().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let resumes = harness.gateway.record.resumes.lock().clone();
    assert_eq!(resumes.len(), 1, "expected exactly one RESUME");
    assert_eq!(resumes[0]["session_id"], "sess-1");
    assert_eq!(resumes[0]["token"], "test-token");
    // Last observed sequence was READY's s=1
    assert_eq!(resumes[0]["seq"], 1);

    // The session never re-identified
    assert_eq!(harness.gateway.record.identifies.lock().len(), 1);

    harness.handle.disconnect(false).await;
    harness.handle.join().await;
}

#[tokio::test]
async fn test_normal_close_clears_session_and_reidentifies() {
    let harness = start(GatewayScenario {
        close_after_ready: Some(1000),
        ..GatewayScenario::default()
    })
    .await;

    // Close code 1000 invalidates the session: the next connection must
    // IDENTIFY from scratch, never RESUME.
    assert!(
        harness
            .gateway
            .record
            .wait_for_connections(2, Duration::from_secs(5))
            .await
    );
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if harness.gateway.record.identifies.lock().len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(harness.gateway.record.identifies.lock().len() >= 2);
    assert!(harness.gateway.record.resumes.lock().is_empty());

    harness.handle.disconnect(false).await;
    harness.handle.join().await;
}

#[tokio::test]
async fn test_missing_heartbeat_ack_forces_reconnect() {
    let harness = start(GatewayScenario {
        heartbeat_interval_ms: 200,
        drop_acks: true,
        ..GatewayScenario::default()
    })
    .await;

    // The second due heartbeat finds the first un-ACKed, closes the
    // zombie socket, and the client reconnects.
    assert!(
        harness
            .gateway
            .record
            .wait_for_connections(2, Duration::from_secs(10))
            .await,
        "client never reconnected after missing ACKs"
    );
    assert!(!harness.gateway.record.heartbeats.lock().is_empty());

    harness.handle.disconnect(false).await;
    harness.handle.join().await;
}

#[tokio::test]
async fn test_heartbeats_are_acknowledged_and_measured() {
    let harness = start(GatewayScenario {
        heartbeat_interval_ms: 150,
        ..GatewayScenario::default()
    })
    .await;

    // Wait for at least one full heartbeat round trip
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if harness.handle.latency().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(harness.handle.latency().is_some(), "latency never measured");
    // The connection survives ACKed heartbeats
    assert_eq!(harness.gateway.record.connection_count(), 1);

    harness.handle.disconnect(false).await;
    harness.handle.join().await;
}

#[tokio::test]
async fn test_disconnect_stops_the_reconnect_cycle() {
    let harness = start(GatewayScenario::default()).await;

    assert!(wait_for_status(&harness.handle, SessionStatus::Ready, Duration::from_secs(5)).await);

    harness.handle.disconnect(false).await;
    tokio::time::timeout(Duration::from_secs(5), harness.handle.join())
        .await
        .expect("session task did not terminate");

    // No reconnect attempt follows an explicit disconnect
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(harness.gateway.record.connection_count(), 1);
}
